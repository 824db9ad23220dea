fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use intake_protocol::constants::{STATUS_INVALID_DOCUMENTS, STATUS_PROCESSING};
    use intake_protocol::{
        CertificateUsage, ExceptionResponse, OpenBatchSessionRequest, OpenBatchSessionResponse,
        PemCertificateInfo, SessionFailure, SessionStatus, SessionStatusResponse,
    };

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn parse_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Deserializes a fixture, re-serializes it and compares the JSON
    /// values. Key order does not matter.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  service: {fixture}\n  client:  {reserialized}"
        );
    }

    #[test]
    fn fixture_public_key_certificates() {
        roundtrip_test::<Vec<PemCertificateInfo>>("public_key_certificates.json");

        let listing: Vec<PemCertificateInfo> = parse_fixture("public_key_certificates.json");
        assert_eq!(listing.len(), 2);
        assert!(listing[0].has_usage(CertificateUsage::SymmetricKeyEncryption));
        assert!(listing[1].has_usage(CertificateUsage::TokenEncryption));
        assert!(listing[0].valid_from < listing[0].valid_to);
    }

    #[test]
    fn unknown_certificate_usage_is_tolerated() {
        let json = r#"[{
            "certificate": "AAAA",
            "validFrom": "2025-06-01T00:00:00Z",
            "validTo": "2027-06-01T00:00:00Z",
            "usage": ["SomethingNew", "SymmetricKeyEncryption"]
        }]"#;
        let listing: Vec<PemCertificateInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(
            listing[0].usage,
            vec![
                CertificateUsage::Unknown,
                CertificateUsage::SymmetricKeyEncryption
            ]
        );
    }

    #[test]
    fn fixture_open_batch_session_request() {
        roundtrip_test::<OpenBatchSessionRequest>("open_batch_session_request.json");

        let req: OpenBatchSessionRequest = parse_fixture("open_batch_session_request.json");
        assert!(!req.offline_mode);
        let ordinals: Vec<u32> = req
            .batch_file
            .file_parts
            .iter()
            .map(|p| p.ordinal_number)
            .collect();
        assert_eq!(ordinals, vec![1, 2]);
        assert_eq!(req.batch_file.file_parts[0].file_name, "part_1.zip.aes");
    }

    #[test]
    fn fixture_open_batch_session_response() {
        roundtrip_test::<OpenBatchSessionResponse>("open_batch_session_response.json");

        let resp: OpenBatchSessionResponse = parse_fixture("open_batch_session_response.json");
        assert_eq!(resp.reference_number, "20260101-SB-0000000001-01");
        let target = &resp.part_upload_requests[1];
        assert_eq!(target.ordinal_number, 2);
        assert_eq!(target.method, "PUT");
        assert_eq!(
            target.headers.get("x-ms-blob-type").map(String::as_str),
            Some("BlockBlob")
        );
    }

    #[test]
    fn fixture_session_status_processing() {
        roundtrip_test::<SessionStatusResponse>("session_status_processing.json");

        let status: SessionStatus =
            parse_fixture::<SessionStatusResponse>("session_status_processing.json").into();
        assert_eq!(status.code, STATUS_PROCESSING);
        assert!(status.is_processing());
        assert_eq!(status.failure_kind(), None);
    }

    #[test]
    fn fixture_session_status_failed() {
        roundtrip_test::<SessionStatusResponse>("session_status_failed.json");

        let status: SessionStatus =
            parse_fixture::<SessionStatusResponse>("session_status_failed.json").into();
        assert_eq!(status.code, STATUS_INVALID_DOCUMENTS);
        assert!(!status.is_processing());
        assert!(!status.is_success());
        assert_eq!(
            status.failure_kind(),
            Some(SessionFailure::InvalidDocumentContent)
        );
        assert_eq!(status.successful_count, 4);
        assert_eq!(status.failed_count, 1);
        assert_eq!(status.details.len(), 1);
    }

    #[test]
    fn fixture_exception_response() {
        roundtrip_test::<ExceptionResponse>("exception_response.json");

        let exception: ExceptionResponse = parse_fixture("exception_response.json");
        assert_eq!(
            exception.summary(),
            "21405: Błąd walidacji danych wejściowych. (fileParts: maksymalna liczba części to 50)"
        );
    }
}
