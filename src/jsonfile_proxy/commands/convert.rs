//! Re-encode a data file between plain JSON and its encrypted form.
//!
//! Both directions go through a regular save, so the lock protocol applies and
//! a concurrent writer makes the conversion fail instead of racing it.

use crate::commands::{CmdMessage, CmdResult};
use crate::dataset::Snapshot;
use crate::error::{ProxyError, Result};
use crate::proxy::JsonFileProxy;

/// Read with `reader`, write with `writer`. Both must point at the same file.
pub fn run(reader: &JsonFileProxy, writer: &JsonFileProxy) -> Result<CmdResult> {
    if reader.target() != writer.target() {
        return Err(ProxyError::Configuration(
            "conversion must read and write the same file".to_string(),
        ));
    }

    let mut result = CmdResult::default();
    let path = writer.target().full_path().display().to_string();

    let Some(envelope) = reader.read_envelope()? else {
        result.add_message(CmdMessage::warning(format!("Nothing stored at {path}")));
        return Ok(result);
    };

    let records = envelope.data.len();
    writer.save(&Snapshot::new(envelope.data))?;

    let form = if writer.is_encrypted() {
        "encrypted"
    } else {
        "plain JSON"
    };
    result.add_message(CmdMessage::success(format!(
        "Rewrote {path} as {form} ({records} record(s))"
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::looks_encrypted;
    use crate::config::ProxyConfig;
    use crate::dataset::store::fixtures::people;
    use crate::dataset::RecordStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_encrypt_then_decrypt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        let plain = JsonFileProxy::new(path.clone()).unwrap();
        let keyed =
            JsonFileProxy::new(ProxyConfig::from(path.clone()).with_encryption_key("k")).unwrap();
        plain.save(&people()).unwrap();

        run(&keyed, &keyed).unwrap();
        assert!(looks_encrypted(&fs::read_to_string(&path).unwrap()));

        run(&keyed, &plain).unwrap();
        assert!(!looks_encrypted(&fs::read_to_string(&path).unwrap()));

        let mut store = RecordStore::new();
        plain.fetch(&mut store).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_nothing_to_convert() {
        let tmp = TempDir::new().unwrap();
        let proxy = JsonFileProxy::new(tmp.path().join("db.json")).unwrap();

        let result = run(&proxy, &proxy).unwrap();
        assert!(result.messages[0].content.starts_with("Nothing stored"));
        assert!(!proxy.target().exists());
    }

    #[test]
    fn test_rejects_different_targets() {
        let tmp = TempDir::new().unwrap();
        let a = JsonFileProxy::new(tmp.path().join("a.json")).unwrap();
        let b = JsonFileProxy::new(tmp.path().join("b.json")).unwrap();
        assert!(run(&a, &b).is_err());
    }
}
