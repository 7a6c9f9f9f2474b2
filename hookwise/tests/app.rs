mod common;

use common::{harness, issues};
use hookwise::testing::RecordingHandler;
use hookwise::{
    AppBuilder, AppConfig, BoxError, ClientScope, ConfigError, Context, Event, InstallationId,
    RegistryError,
};
use std::sync::Arc;

fn triage(app: &mut AppBuilder) -> Result<(), RegistryError> {
    app.on(["issues.opened", "issues.reopened"], RecordingHandler::new())?
        .on("issues.labeled", RecordingHandler::new())?;
    Ok(())
}

#[tokio::test]
async fn plugins_register_into_the_app() {
    let mut h = harness();
    h.builder.load(triage).unwrap();
    let app = h.builder.build();

    assert_eq!(app.registry().len(), 3);
    assert_eq!(app.registry().get("issues.reopened").len(), 1);
    assert!(app.registry().get("issues").is_empty());
}

#[tokio::test]
async fn failing_plugin_stops_loading() {
    let mut h = harness();
    let err = h
        .builder
        .load(|app: &mut AppBuilder| {
            app.on("issues.", RecordingHandler::new())?;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(err, RegistryError::InvalidPattern("issues.".into()));
    assert!(h.builder.build().registry().is_empty());
}

#[tokio::test]
async fn handler_can_authenticate_as_another_installation() {
    let mut h = harness();
    let authenticator = h.builder.authenticator().clone();
    let recorder = RecordingHandler::new();
    h.builder
        .on("issues.opened", move |_event: Arc<Event>, _ctx: Context| {
            let authenticator = authenticator.clone();
            async move {
                let other = authenticator.auth(Some(InstallationId::new(99))).await?;
                assert_eq!(other.scope(), ClientScope::Installation(InstallationId::new(99)));
                Ok::<_, BoxError>(())
            }
        })
        .unwrap()
        .on("issues.opened", recorder.clone())
        .unwrap();
    let app = h.builder.build();

    app.receive(issues("opened", 1)).await.unwrap();

    assert_eq!(h.issuer.issued_count(), 2);
    assert_eq!(recorder.count(), 1);
}

#[test]
fn from_config_rejects_incomplete_settings() {
    let missing = AppConfig::default();
    assert!(matches!(
        AppBuilder::from_config(&missing),
        Err(ConfigError::Missing("APP_ID"))
    ));

    let bad_key = AppConfig {
        app_id: Some(1),
        private_key: Some("not a key".into()),
        ..AppConfig::default()
    };
    assert!(matches!(
        AppBuilder::from_config(&bad_key),
        Err(ConfigError::Invalid { name: "PRIVATE_KEY", .. })
    ));
}
