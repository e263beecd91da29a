//! Interactive chat application for conversing with DeepSeek models.
//!
//! This binary provides a streaming REPL interface for chatting with any
//! OpenAI-compatible chat completion API.  The API key is read from the
//! `DEEPSEEK_API_KEY` environment variable.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! seekchat
//!
//! # Specify a model
//! seekchat --model deepseek-reasoner
//!
//! # Set a system prompt
//! seekchat --system "You are a helpful coding assistant"
//!
//! # Disable colors (useful for piping output)
//! seekchat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/model <name>` - Change the model
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application
//!
//! Ctrl-C while a response is streaming cancels it.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use seekchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, DEFAULT_SYSTEM_PROMPT, PlainTextRenderer, Renderer,
    StreamOutcome, StreamPrinter, StreamingSessionController, help_text, parse_command,
};
use seekchat::{DeepSeek, Model};

type Session = StreamingSessionController<DeepSeek>;

/// Main entry point for the seekchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("seekchat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;
    let mut show_usage = config.show_usage;

    let client = DeepSeek::with_options(None, config.base_url.clone(), None)?;
    let mut session = StreamingSessionController::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Ctrl-C outside the prompt cancels the in-flight response.
    let cancel = session.cancel_handle();
    ctrlc::set_handler(move || {
        cancel.cancel();
    })?;

    println!("DeepSeek Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear_conversation();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model_name) => {
                            let model = model_name
                                .parse()
                                .unwrap_or_else(|_| Model::Custom(model_name.clone()));
                            session.set_model(model);
                            renderer.print_info(&format!("Model changed to: {}", model_name));
                        }
                        ChatCommand::System(prompt) => {
                            let prompt =
                                prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
                            renderer.print_info(&format!(
                                "System prompt set to: {} (takes effect after /clear)",
                                prompt
                            ));
                            session.set_system_prompt(prompt);
                        }
                        ChatCommand::MaxTokens(value) => {
                            session.set_max_tokens(value);
                            renderer.print_info(&format!("max_tokens set to {value}"));
                        }
                        ChatCommand::Temperature(value) => {
                            session.set_temperature(value);
                            renderer.print_info(&format!("temperature set to {:.2}", value));
                        }
                        ChatCommand::Usage(show) => {
                            show_usage = show;
                            if show {
                                renderer.print_info("Usage display enabled.");
                            } else {
                                renderer.print_info("Usage display hidden.");
                            }
                        }
                        ChatCommand::History => {
                            print_history(&session);
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session, show_usage);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                println!("DeepSeek:");
                stream_response(&mut session, line, &mut renderer, show_usage).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Sends `line` and prints the reply as it streams in.
async fn stream_response(
    session: &mut Session,
    line: &str,
    renderer: &mut PlainTextRenderer,
    show_usage: bool,
) {
    let mut rx = session.subscribe();
    rx.borrow_and_update();
    let mut printer = StreamPrinter::new();

    let outcome = {
        let send = session.send_user_message(line);
        tokio::pin!(send);
        loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break (&mut send).await;
                    }
                    printer.render(&rx.borrow_and_update(), renderer);
                }
            }
        }
    };

    match &outcome {
        StreamOutcome::Committed => {
            if let Some(message) = session.conversation().last() {
                printer.finish(message.content(), renderer);
            }
            renderer.finish_response();
        }
        StreamOutcome::Empty => {
            renderer.finish_response();
            renderer.print_info("(empty response)");
        }
        StreamOutcome::Failed(err) => {
            renderer.finish_response();
            renderer.print_error(&err.to_string());
        }
        StreamOutcome::Cancelled => {
            renderer.print_interrupted();
        }
    }

    if show_usage
        && !matches!(outcome, StreamOutcome::Cancelled)
        && let Some(usage) = session.usage()
    {
        renderer.print_usage(&usage);
    }
}

fn print_history(session: &Session) {
    let mut empty = true;
    for message in session.conversation().renderable() {
        empty = false;
        println!("    [{}] {}", message.role().as_str(), message.content());
    }
    if empty {
        println!("    (no messages)");
    }
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!("      Max tokens: {}", stats.max_tokens);
    println!("      Temperature: {:.2}", stats.temperature);
    println!(
        "      Requests: {} ({} committed, {} failed, {} cancelled)",
        stats.total_requests,
        stats.committed_responses,
        stats.failed_responses,
        stats.cancelled_responses
    );
    match stats.last_usage {
        Some(usage) => println!("      Last usage: {}", seekchat::chat::format_usage(&usage)),
        None => println!("      Last usage: (none)"),
    }
}

fn print_config(session: &Session, show_usage: bool) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Model: {}", config.model);
    println!("      Max tokens: {}", config.max_tokens);
    println!("      Temperature: {:.2}", config.temperature);
    println!("      System prompt: {}", config.system_prompt);
    println!(
        "      Usage display: {}",
        if show_usage { "shown" } else { "hidden" }
    );
    println!("      Color: {}", if config.use_color { "on" } else { "off" });
    match config.base_url.as_deref() {
        Some(url) => println!("      Base URL: {}", url),
        None => println!("      Base URL: (default)"),
    }
}
