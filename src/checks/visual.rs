//! Visual checks: screenshot capture through the screenshot service.

use log::warn;

use crate::models::{CheckResult, CheckType, CheckValue, PatrolCheck, PatrolTask};
use crate::services::{AuthContext, CaptureMode, ScreenshotService};
use crate::variables::safe_name;

pub(crate) async fn run(
    service: Option<&dyn ScreenshotService>,
    check: &PatrolCheck,
    task: &PatrolTask,
    url: &str,
    auth: &AuthContext,
) -> CheckResult {
    let Some(service) = service else {
        return CheckResult::failed(CheckType::VisualCheck, "screenshot service not configured");
    };

    let mode = CaptureMode::from_target(&check.target);
    let name = format!("{}_{}", safe_name(&task.name), safe_name(&check.name));
    match service.capture(url, &name, &mode, auth).await {
        Ok(path) => {
            let path = path.display().to_string();
            let mut result = CheckResult::new(CheckType::VisualCheck);
            result.success = true;
            result.message = format!("Screenshot captured ({mode:?}): {path}");
            result.value = CheckValue::Path(path);
            result
        }
        Err(e) => {
            warn!("Screenshot for check '{}' on {url} failed: {e}", check.name);
            CheckResult::failed(CheckType::VisualCheck, format!("Screenshot failed: {e}"))
        }
    }
}
