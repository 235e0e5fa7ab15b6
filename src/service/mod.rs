//! Service reloads after certificates or configs change

use crate::args;
use crate::config::ReloadMethod;
use crate::process::{run_checked, CommandRunner};
use crate::utils::CommandError;
use tracing::info;

/// Tool a reload method depends on, with its purpose, for dependency checks
pub fn required_tool(method: ReloadMethod) -> Option<(&'static str, &'static str)> {
    match method {
        ReloadMethod::Systemctl => Some(("systemctl", "service reload")),
        ReloadMethod::Nginx => Some(("nginx", "nginx reload")),
        ReloadMethod::None => None,
    }
}

/// Reload `service` so it picks up new files
pub fn reload(
    runner: &dyn CommandRunner,
    method: ReloadMethod,
    service: &str,
) -> Result<(), CommandError> {
    match method {
        ReloadMethod::Systemctl => {
            info!(service, "Reloading via systemctl");
            run_checked(runner, "systemctl", &args!["reload", service]).map(|_| ())
        }
        ReloadMethod::Nginx => nginx_reload(runner),
        ReloadMethod::None => Ok(()),
    }
}

/// `nginx -t`
pub fn nginx_test(runner: &dyn CommandRunner) -> Result<(), CommandError> {
    run_checked(runner, "nginx", &args!["-t"]).map(|_| ())
}

/// `nginx -t` followed by `nginx -s reload`
pub fn nginx_reload(runner: &dyn CommandRunner) -> Result<(), CommandError> {
    nginx_test(runner)?;
    info!("Reloading nginx");
    run_checked(runner, "nginx", &args!["-s", "reload"]).map(|_| ())
}
