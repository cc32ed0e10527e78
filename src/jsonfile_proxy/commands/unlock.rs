use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::lock;
use crate::proxy::JsonFileProxy;

/// Remove a stale lock file left behind by a writer that died mid-save.
pub fn run(proxy: &JsonFileProxy) -> Result<CmdResult> {
    let target = proxy.target();
    let mut result = CmdResult::default();

    match lock::force_unlock(target)? {
        Some(owner) => result.add_message(CmdMessage::success(format!(
            "Removed lock on {} held by process {}",
            target.full_path().display(),
            owner
        ))),
        None => result.add_message(CmdMessage::info(format!(
            "{} is not locked",
            target.full_path().display()
        ))),
    }

    Ok(result)
}
