//! Requests against a real endpoint, only run with `CLOUDSIGN_AWS_V4_TEST=on`.

use std::env;

use anyhow::Result;
use cloudsign_aws_v4::{Config, RequestDescription, RequestSigner};
use cloudsign_core::OsEnv;
use http::StatusCode;
use log::{debug, warn};

fn init_live_test() -> Option<Config> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("CLOUDSIGN_AWS_V4_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    Some(Config::default().from_env(&OsEnv))
}

#[tokio::test]
async fn test_describe_regions() -> Result<()> {
    let Some(config) = init_live_test() else {
        warn!("CLOUDSIGN_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let req = RequestDescription::builder()
        .method("GET")
        .host(format!("ec2.{}.amazonaws.com", config.region()))
        .query("Action", "DescribeRegions")
        .query("Version", "2016-11-15")
        .region(config.region())
        .service("ec2")
        .credential(config.credential()?)
        .build()?;

    let auth = RequestSigner::new().sign(&req)?;
    let http_req = req.to_http_request(&auth)?;
    debug!("signed request: {http_req:?}");

    let resp = reqwest::Client::new()
        .execute(reqwest::Request::try_from(http_req)?)
        .await?;
    debug!("got response: {resp:?}");

    assert_eq!(StatusCode::OK, resp.status());
    Ok(())
}
