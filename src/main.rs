use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tlspeek::configuration::CliArgs;
use tlspeek::controller::Controller;
use tlspeek::data_capture::{CaptureSink, FanoutSink, JsonLinesSink, LogSink};
use tlspeek::instrumentation::{DynEventReader, EventSource};

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let args = CliArgs::parse();

    info!("Importing configuration");
    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration imported successfully");

    let sink: Arc<dyn CaptureSink> = if args.json {
        let sinks: Vec<Box<dyn CaptureSink>> =
            vec![Box::new(LogSink), Box::new(JsonLinesSink::stdout())];
        Arc::new(FanoutSink::new(sinks))
    } else {
        Arc::new(LogSink)
    };

    let controller = match Controller::with_sink(config, sink) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    let mut sources: Vec<EventSource<DynEventReader>> = Vec::new();
    if args.events.is_empty() {
        sources.push(EventSource::stdin());
    }
    for path in &args.events {
        match EventSource::open(Path::new(path)).await {
            Ok(source) => sources.push(source),
            Err(e) => {
                error!("Unable to open {}: {}, exiting...", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    match controller.run(sources).await {
        Ok(summary) => info!(
            "Done: {} capture(s) from {} write(s)",
            summary.captures_emitted, summary.writes_observed
        ),
        Err(e) => {
            error!("Error occured in the controller process: {}, exiting...", e);
            std::process::exit(1);
        }
    }
}
