use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::proxy::JsonFileProxy;

/// Decode the data file and return its envelope.
pub fn run(proxy: &JsonFileProxy) -> Result<CmdResult> {
    match proxy.read_envelope()? {
        Some(envelope) => Ok(CmdResult::default().with_envelope(envelope)),
        None => {
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::info(format!(
                "No data stored at {}",
                proxy.target().full_path().display()
            )));
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::dataset::store::fixtures::people;
    use crate::envelope::Payload;
    use tempfile::TempDir;

    #[test]
    fn test_show_empty_target() {
        let tmp = TempDir::new().unwrap();
        let proxy = JsonFileProxy::new(tmp.path().join("db.json")).unwrap();

        let result = run(&proxy).unwrap();
        assert!(result.envelope.is_none());
        assert!(result.messages[0].content.starts_with("No data stored"));
    }

    #[test]
    fn test_show_decrypts_with_key() {
        let tmp = TempDir::new().unwrap();
        let proxy = JsonFileProxy::new(
            ProxyConfig::from(tmp.path().join("db.json")).with_encryption_key("k"),
        )
        .unwrap();
        proxy.save(&people()).unwrap();

        let envelope = run(&proxy).unwrap().envelope.unwrap();
        match envelope.data {
            Payload::Records(records) => assert_eq!(records[1]["lastname"], "Master"),
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
