use std::sync::Arc;

use mailprobe_core::{email_routes, list_routes, LocalMailer, RouteGroup, ServiceConfig};

use crate::cli::args::RoutesArgs;
use crate::exit_codes::{CONFIG_ERROR, SUCCESS};

pub fn run(args: RoutesArgs) -> anyhow::Result<i32> {
    let config = ServiceConfig::default().with_mount_prefix(args.mount.mount_prefix);
    let prefix = match config.validate() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(CONFIG_ERROR);
        }
    };

    let app = RouteGroup::new().nest(&prefix, email_routes(Arc::new(LocalMailer::default())));
    for route in list_routes(app.registry()) {
        println!("{route}");
    }
    Ok(SUCCESS)
}
