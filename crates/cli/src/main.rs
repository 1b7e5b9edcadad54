use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use pl_cli::bootstrap;
use pl_cli::cli::run::RunArgs;
use pl_cli::cli::{Cli, Command, ConfigCommand};
use pl_domain::config::ObservabilityConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            message,
            session,
            user,
            model,
            workspace,
            kwargs,
            json,
        } => {
            let (config, _) = pl_cli::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability);
            let app = bootstrap::build_app(config)?;
            let args = RunArgs {
                message,
                session,
                user,
                model,
                workspace,
                kwargs,
                json,
            };
            let outcome = pl_cli::cli::run::run(&app, args).await;
            if let Some(provider) = tracer_provider {
                if let Err(e) = provider.shutdown() {
                    eprintln!("failed to flush traces: {e}");
                }
            }
            outcome
        }
        Command::History { session, user, json } => {
            init_cli_tracing();
            let (config, _) = pl_cli::cli::load_config()?;
            let app = bootstrap::build_app(config)?;
            pl_cli::cli::history::show(&app, session, user, json).await
        }
        Command::Models => {
            let (config, _) = pl_cli::cli::load_config()?;
            let registry = bootstrap::build_registry(&config.llm);
            pl_cli::cli::models::list(&registry);
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = pl_cli::cli::load_config()?;
            if !pl_cli::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = pl_cli::cli::load_config()?;
            pl_cli::cli::config::show(&config)
        }
    }
}

/// Tracing for turns: stderr logs (compact or JSON) and, when
/// `otlp_endpoint` is set, an OpenTelemetry layer exporting every span
/// over OTLP/gRPC. The returned provider must be shut down before exit to
/// flush pending spans.
fn init_tracing(obs: &ObservabilityConfig) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,pl_runtime=info"));

    let json_layer = obs
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let compact_layer = (!obs.json_logs)
        .then(|| tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr));

    let Some(endpoint) = obs.otlp_endpoint.as_deref() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(compact_layer)
            .init();
        return None;
    };

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!("WARNING: failed to create OTLP exporter for {endpoint}: {e}; continuing without OpenTelemetry");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .with(compact_layer)
                .init();
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
            obs.sample_rate,
        ))
        .with_resource(resource)
        .build();

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("parley"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(compact_layer)
        .with(otel_layer)
        .init();

    Some(tracer_provider)
}

/// Warn-level stderr logs for commands that only read state.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
