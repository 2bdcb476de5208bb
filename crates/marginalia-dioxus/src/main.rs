use dioxus::prelude::*;
use std::env;
use std::path::PathBuf;
use std::process;

mod ui;

use marginalia_config::Config;
use marginalia_engine::content::{Locale, validate_content_dir};
use ui::App;

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("marginalia starting up");

    let (content_path, locale, from_config) = startup_settings();

    if let Err(e) = validate_content_dir(&content_path) {
        let source = if from_config {
            format!(" from config file '{}'", Config::config_path().display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Content path '{}'{} is invalid: {e}",
            content_path.display(),
            source
        );
        process::exit(1);
    }

    log::info!(
        "launching reader for {} at locale {locale}",
        content_path.display()
    );
    dioxus::LaunchBuilder::desktop()
        .with_cfg(make_window_config())
        .launch(app_root);
}

/// Content path and starting locale from CLI args or the config file.
/// A CLI argument overrides the configured path but keeps the saved locale.
fn startup_settings() -> (PathBuf, Locale, bool) {
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Usage: {} [content-folder-path]", args[0]);
            process::exit(1);
        }
    };

    let locale = config
        .as_ref()
        .and_then(|c| Locale::from_code(&c.locale))
        .unwrap_or(Locale::Zh);

    match args.len() {
        2 => (PathBuf::from(&args[1]), locale, false),
        1 => match config {
            Some(config) => (config.content_path, locale, true),
            None => {
                eprintln!("Error: No content path provided and no config file found");
                eprintln!("Usage: {} <content-folder-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
        },
        _ => {
            eprintln!("Usage: {} [content-folder-path]", args[0]);
            process::exit(1);
        }
    }
}

fn app_root() -> Element {
    // Re-derive startup settings: launch() takes a plain fn
    let (content_path, locale, _) = startup_settings();

    rsx! {
        App {
            content_path,
            initial_locale: locale,
        }
    }
}

fn make_window_config() -> dioxus::desktop::Config {
    use dioxus::desktop::{Config, WindowBuilder};

    let window = WindowBuilder::new()
        .with_title("marginalia")
        .with_always_on_top(false);

    Config::default().with_window(window)
}
