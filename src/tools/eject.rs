use crate::tools::error::ToolResult;
use crate::tools::exec::run_checked;
use log::info;

pub async fn eject(device: &str) -> ToolResult<()> {
    info!("Ejecting {device}...");
    run_checked("eject", &[device.into()]).await?;
    Ok(())
}
