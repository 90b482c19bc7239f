use std::sync::Arc;

use mailprobe_core::{email_routes, start, LocalMailer, ServiceConfig, ServiceError};
use tracing::info;

use crate::cli::args::ServeArgs;
use crate::exit_codes::{CONFIG_ERROR, SERVICE_ERROR, SUCCESS};

pub async fn run(args: ServeArgs) -> anyhow::Result<i32> {
    let config = ServiceConfig::default()
        .with_port(args.port)
        .with_allowed_origins(args.allowed_origins)
        .with_mount_prefix(args.mount.mount_prefix);

    let mailer = LocalMailer::default()
        .with_known_candidates(args.known_candidates)
        .with_default_recipient(args.default_recipient);

    let service = match start(config, email_routes(Arc::new(mailer))).await {
        Ok(service) => service,
        Err(e) => return Ok(report_service_error(&e)),
    };

    println!("mailprobe service listening on {}", service.base_url());
    for route in service.routes() {
        println!("  {route}");
    }

    let result = service
        .serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await;

    match result {
        Ok(()) => {
            info!("verification service stopped");
            Ok(SUCCESS)
        }
        Err(e) => Ok(report_service_error(&e)),
    }
}

fn report_service_error(e: &ServiceError) -> i32 {
    eprintln!("error: {e}");
    match e {
        ServiceError::InvalidConfig { .. } => CONFIG_ERROR,
        ServiceError::PortInUse { .. } => {
            eprintln!("hint: stop the process using the port or pass --port");
            SERVICE_ERROR
        }
        _ => SERVICE_ERROR,
    }
}
