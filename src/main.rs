#![warn(clippy::all, rust_2018_idioms)]

// Native stand-in host: registers the bindings, optionally drives them from
// stdin, and stays resident until Ctrl+C or the host closes.
#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::io::{self, BufRead};
    use std::sync::Arc;
    use std::thread;

    use anyhow::Context;
    use clap::Parser;
    use lilypad_wrapper::handlers::{PROCESS_DATA, register_defaults};
    use lilypad_wrapper::{
        BridgeConfig, ErrorMode, HostValue, LocalNamespace, Registrar, Registry, ResidencyGuard,
        ShutdownSignal,
    };

    #[derive(Parser)]
    #[command(name = "lilypad-wrapper")]
    #[command(about = "Host the exported bindings natively until interrupted")]
    struct Cli {
        /// Override the configured error mode
        #[arg(long, value_enum)]
        error_mode: Option<ErrorMode>,
        /// Override the configured log level
        #[arg(long)]
        log_level: Option<String>,
        /// Read one JSON argument array per line from stdin and call the binding with it
        #[arg(long)]
        stdin: bool,
        /// Binding driven by --stdin
        #[arg(long, default_value = PROCESS_DATA)]
        binding: String,
    }

    let cli = Cli::parse();

    let mut config = BridgeConfig::from_env().context("Failed to read configuration")?;
    if let Some(mode) = cli.error_mode {
        config.error_mode = mode;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    let level = config.level()?;

    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();

    let registry = Arc::new(Registry::new());
    let mut registrar = Registrar::new(registry.clone(), LocalNamespace);
    register_defaults(&mut registrar, &config).context("Failed to register bindings")?;

    let guard = ResidencyGuard::new();

    let ctrl_c = guard.shutdown_handle();
    ctrlc::set_handler(move || {
        ctrl_c.request(ShutdownSignal::Interrupted);
    })
    .context("Error setting Ctrl-C handler")?;

    if cli.stdin {
        let host_closed = guard.shutdown_handle();
        let binding = cli.binding;
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::error!("Failed to read stdin: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let args: Vec<HostValue> = match serde_json::from_str::<Vec<serde_json::Value>>(&line) {
                    Ok(values) => values.into_iter().map(HostValue::from).collect(),
                    Err(e) => {
                        eprintln!("Expected a JSON array of arguments: {e}");
                        continue;
                    }
                };
                match registry.invoke(&binding, &args) {
                    Ok(value) => println!("{}", value.to_json()),
                    Err(e) => eprintln!("{}: {e}", e.name()),
                }
            }
            host_closed.request(ShutdownSignal::HostClosed);
        });
    }

    log::info!("Resident, press Ctrl+C to stop");
    let signal = guard.block_forever(&mut registrar);
    log::info!("Stopped: {signal}");
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The module entry point is `start` in the library, called by wasm-bindgen.
}
