use std::{error::Error, process::ExitCode};

use tracing::{error, info, warn};

use sysv_service::{
    cli::{Cli, Commands, parse_args},
    config::{ServiceDescriptor, load_config},
    detect,
    error::ServiceError,
    install::LinkReport,
    logs,
    runtime::Layout,
    service::SysvService,
    status::Status,
    workload::CommandWorkload,
};

fn main() -> ExitCode {
    let args = parse_args();
    logs::init_logging(
        args.log_level.as_ref().map(|level| level.as_str()),
        logs::is_interactive(),
    );

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<ExitCode, Box<dyn Error>> {
    if let Commands::Detect = args.command {
        let busybox = detect::is_running_busybox();
        println!("{}", if busybox { "busybox" } else { "standard" });
        return Ok(ExitCode::SUCCESS);
    }

    let service = build_service(&args)?;

    match args.command {
        Commands::Install => {
            let report = service.install()?;
            print_report(&report);
            println!("Installed {}", service.display());
        }
        Commands::Uninstall => {
            service.uninstall()?;
            println!("Uninstalled {}", service.display());
        }
        Commands::Enable => print_report(&service.set_enabled(true)),
        Commands::Disable => print_report(&service.set_enabled(false)),
        Commands::Start => service.start()?,
        Commands::Stop => service.stop()?,
        Commands::Restart => service.restart()?,
        Commands::Status { json } => return show_status(&service, json),
        Commands::Run => {
            let mut workload = CommandWorkload::new();
            service.run(&mut workload)?;
        }
        Commands::Render { busybox } => {
            let busybox = busybox || detect::is_running_busybox();
            print!("{}", service.render(busybox)?);
        }
        Commands::Detect => {}
    }

    Ok(ExitCode::SUCCESS)
}

fn build_service(args: &Cli) -> Result<SysvService, ServiceError> {
    let descriptor: ServiceDescriptor = load_config(&args.config)?;
    info!(
        "Loaded service '{}' from {}",
        descriptor.name,
        args.config.display()
    );
    Ok(SysvService::new(descriptor, Layout::with_root(&args.root)))
}

fn print_report(report: &LinkReport) {
    for path in &report.created {
        println!("created {}", path.display());
    }
    for path in &report.removed {
        println!("removed {}", path.display());
    }
    for (path, err) in &report.failed {
        warn!("Skipped autostart link {}: {}", path.display(), err);
    }
}

/// Prints the status; exits 0 when running, 1 when stopped, 3 when unknown.
fn show_status(service: &SysvService, json: bool) -> Result<ExitCode, Box<dyn Error>> {
    let result = service.status();
    let status = Status::from_result(&result);

    if json {
        let error = result.as_ref().err().map(ToString::to_string);
        let payload = serde_json::json!({
            "name": service.descriptor().name,
            "platform": service.platform(),
            "status": status,
            "error": error,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        match &result {
            Ok(_) => println!("{}: {}", service.display(), status),
            Err(err) => println!("{}: {} ({})", service.display(), status, err),
        }
    }

    Ok(match status {
        Status::Running => ExitCode::SUCCESS,
        Status::Stopped => ExitCode::from(1),
        Status::Unknown => ExitCode::from(3),
    })
}
