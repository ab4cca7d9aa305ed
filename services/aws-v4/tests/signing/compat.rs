//! Cross-check signatures against the `aws-sigv4` crate.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use bytes::Bytes;
use cloudsign_aws_v4::{Credential, Payload, RequestDescription, RequestSigner};
use pretty_assertions::assert_eq;

use super::fixed_time;

/// (name, request_builder)
type TestCase = (&'static str, fn() -> RequestDescription);

fn test_cases() -> Vec<TestCase> {
    vec![
        ("get_describe_regions", test_get_describe_regions),
        ("get_with_path", test_get_with_path),
        ("post_with_body", test_post_with_body),
        ("get_with_session_token", test_get_with_session_token),
    ]
}

fn base(method: &str) -> cloudsign_aws_v4::RequestDescriptionBuilder {
    RequestDescription::builder()
        .method(method)
        .host("ec2.us-east-1.amazonaws.com")
        .region("us-east-1")
        .service("ec2")
        .credential(Credential::new("access_key_id", "secret_access_key"))
        .timestamp(fixed_time())
}

fn test_get_describe_regions() -> RequestDescription {
    base("GET")
        .query("Version", "2016-11-15")
        .query("Action", "DescribeRegions")
        .build()
        .unwrap()
}

fn test_get_with_path() -> RequestDescription {
    base("GET")
        .path("/hello/world.txt")
        .query("list-type", "2")
        .query("max-keys", "3")
        .build()
        .unwrap()
}

fn test_post_with_body() -> RequestDescription {
    base("POST")
        .header("content-type", "application/x-www-form-urlencoded")
        .payload(Payload::Bytes(Bytes::from_static(
            b"Action=DescribeVolumes&Version=2016-11-15",
        )))
        .build()
        .unwrap()
}

fn test_get_with_session_token() -> RequestDescription {
    base("GET")
        .query("Action", "DescribeImages")
        .credential(
            Credential::new("access_key_id", "secret_access_key")
                .with_session_token("security_token"),
        )
        .build()
        .unwrap()
}

fn aws_sigv4_signature(req: &RequestDescription) -> anyhow::Result<String> {
    let auth = RequestSigner::new().sign(req)?;
    let http_req = req.to_http_request(&auth)?;

    let cred = req.credential();
    let id = Credentials::new(
        cred.access_key_id.clone(),
        cred.secret_access_key.clone(),
        cred.session_token.clone(),
        None,
        "hardcoded-credentials",
    )
    .into();
    let sp = v4::SigningParams::builder()
        .identity(&id)
        .region(req.region())
        .name(req.service())
        .time(SystemTime::from(fixed_time()))
        .settings(SigningSettings::default())
        .build()
        .expect("signing params must be valid");

    // Only caller headers go in; aws-sigv4 adds host, date and token itself.
    let headers = req
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect::<Vec<_>>();
    let body = req.payload().to_bytes()?;

    let output = aws_sigv4::http_request::sign(
        SignableRequest::new(
            http_req.method().as_str(),
            http_req.uri().to_string(),
            headers.into_iter(),
            SignableBody::Bytes(&body),
        )
        .expect("signable request must be valid"),
        &sp.into(),
    )
    .expect("signing must succeed");
    let (_, signature) = output.into_parts();
    Ok(signature)
}

#[test]
fn test_matches_aws_sigv4() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    for (name, req_fn) in test_cases() {
        let req = req_fn();
        let expected = aws_sigv4_signature(&req)?;
        let actual = RequestSigner::new().sign(&req)?;

        assert_eq!(expected, actual.signature(), "{name} signature mismatch");
    }
    Ok(())
}
