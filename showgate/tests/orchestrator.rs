mod common;

use std::time::Duration;

use common::{HostScript, MockConnector, Reply, device_json};
use serde_json::json;
use showgate::parse::NoParser;
use showgate::platform::JUNOS_UNSUPPORTED;
use showgate::{Error, Orchestrator, RelayHost, ServiceConfig, ShowRequest};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn request(value: serde_json::Value) -> ShowRequest {
    serde_json::from_value(value).unwrap()
}

fn three_devices(commands: serde_json::Value) -> ShowRequest {
    request(json!({
        "devices": [device_json("r1", "ios"), device_json("r2", "iosxe"), device_json("r3", "nxos")],
        "commands": commands,
    }))
}

#[tokio::test]
async fn scenario_single_device_single_command() {
    let config = ServiceConfig::default();
    let orchestrator = Orchestrator::new(&config, MockConnector::new(), NoParser);

    let req = request(json!({
        "devices": [{"hostname": "10.0.0.1", "username": "admin", "password": "x", "os": "iosxe"}],
        "commands": [{"command": "show version"}],
    }));
    let batch = assert_ok!(orchestrator.execute(&req, &CancellationToken::new()).await);

    assert_eq!(batch.total_devices, 1);
    assert_eq!(batch.succeeded_devices, 1);
    assert_eq!(batch.failed_devices, 0);
    assert_eq!(batch.results[0].commands.len(), 1);
    assert!(batch.results[0].commands[0].success);
}

#[tokio::test]
async fn invalid_command_prevents_any_connection() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new();
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let req = three_devices(json!(["show version", "configure terminal", "show clock"]));
    let err = assert_err!(orchestrator.execute(&req, &CancellationToken::new()).await);

    assert!(err.is_client_error());
    match err {
        Error::Policy(v) => assert_eq!(v.command_index, Some(1)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stats.connects(), 0);
}

#[tokio::test]
async fn semicolon_is_named_in_rejection() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new();
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let req = request(json!({
        "devices": [device_json("r1", "ios")],
        "commands": ["show version; reload"],
    }));
    let err = assert_err!(orchestrator.execute(&req, &CancellationToken::new()).await);

    match err {
        Error::Policy(v) => {
            assert_eq!(v.token.as_deref(), Some(";"));
            assert!(v.message.contains(';'));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stats.connects(), 0);
}

#[tokio::test]
async fn junos_is_rejected_with_dedicated_message() {
    let config = ServiceConfig::default();
    let orchestrator = Orchestrator::new(&config, MockConnector::new(), NoParser);

    let req = request(json!({
        "devices": [device_json("mx1", "junos")],
        "commands": ["show version"],
    }));
    let err = assert_err!(orchestrator.execute(&req, &CancellationToken::new()).await);

    match err {
        Error::Descriptor(d) => {
            let os = d.violations.iter().find(|v| v.field == "devices[0].os").unwrap();
            assert_eq!(os.message, JUNOS_UNSUPPORTED);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn one_unreachable_device_does_not_stop_the_batch() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new().host("r2", HostScript::refusing());
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let req = three_devices(json!(["show version"]));
    let batch = assert_ok!(orchestrator.execute(&req, &CancellationToken::new()).await);

    assert_eq!(batch.succeeded_devices, 2);
    assert_eq!(batch.failed_devices, 1);
    let hosts: Vec<_> = batch.results.iter().map(|r| r.hostname.as_str()).collect();
    assert_eq!(hosts, ["r1", "r2", "r3"]);
    assert!(!batch.results[1].success);
    assert!(batch.results[1].commands.is_empty());
    assert_eq!(stats.connects(), 3);
    assert_eq!(stats.closes(), stats.opened());
}

#[tokio::test]
async fn command_timeout_keeps_device_successful() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new().host("r1", HostScript::default().reply("show clock", Reply::Hang));
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let req = request(json!({
        "devices": [device_json("r1", "ios")],
        "commands": ["show version", "show clock"],
        "timeout": 1,
    }));
    let batch = assert_ok!(orchestrator.execute(&req, &CancellationToken::new()).await);

    let device = &batch.results[0];
    assert!(device.success);
    assert_eq!(device.commands.len(), 2);
    assert!(device.commands[0].success);
    assert!(!device.commands[1].success);
    assert_eq!(batch.succeeded_devices, 1);
}

#[tokio::test]
async fn all_commands_failing_still_counts_as_connected() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new().host(
        "r1",
        HostScript::default()
            .reply("show foo", Reply::Fail("% Invalid input".into()))
            .reply("show bar", Reply::Fail("% Invalid input".into())),
    );
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let req = request(json!({
        "devices": [device_json("r1", "ios")],
        "commands": ["show foo", "show bar"],
    }));
    let batch = assert_ok!(orchestrator.execute(&req, &CancellationToken::new()).await);

    assert_eq!(batch.succeeded_devices, 1);
    assert_eq!(batch.results[0].succeeded_commands(), 0);
}

#[tokio::test]
async fn relay_routes_reach_the_connector() {
    let config = ServiceConfig {
        relay: Some(RelayHost {
            host: "bastion.example.net".to_string(),
            port: 2222,
            username: "jump".to_string(),
            key_path: "/keys/jump".into(),
        }),
        ..ServiceConfig::default()
    };
    let connector = MockConnector::new();
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let mut devices = vec![device_json("r1", "ios"), device_json("r2", "ios")];
    devices[1]["jumphost"] = json!({"host": "edge-jump", "username": "ops", "key_path": "/keys/ops"});
    let req = request(json!({
        "devices": devices,
        "commands": ["show version"],
        "use_jumphost": true,
    }));
    let batch = assert_ok!(orchestrator.execute(&req, &CancellationToken::new()).await);

    assert_eq!(batch.results[0].route, "relay:bastion.example.net:2222");
    assert_eq!(batch.results[1].route, "relay:edge-jump:22");
    assert_eq!(stats.route_of("r1").as_deref(), Some("relay:bastion.example.net:2222"));
}

#[tokio::test]
async fn cancelled_request_contacts_nobody() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new();
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let batch = assert_ok!(orchestrator.execute(&three_devices(json!(["show version"])), &cancel).await);

    assert_eq!(stats.connects(), 0);
    assert_eq!(batch.failed_devices, 3);
    assert!(batch.results.iter().all(|r| r.error.as_deref() == Some(showgate::batch::CANCELLED)));
}

#[tokio::test]
async fn cancellation_lets_running_device_finish() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new().connect_delay(Duration::from_millis(200));
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let cancel = CancellationToken::new();
    let req = three_devices(json!(["show version"]));
    let (batch, _) = tokio::join!(orchestrator.execute(&req, &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });
    let batch = assert_ok!(batch);

    assert!(batch.results[0].success);
    assert!(!batch.results[1].success);
    assert!(!batch.results[2].success);
    assert_eq!(stats.connects(), 1);
    assert_eq!(stats.closes(), 1);
}

#[tokio::test]
async fn concurrency_is_bounded_and_order_kept() {
    let config = ServiceConfig {
        max_concurrency: 2,
        ..ServiceConfig::default()
    };
    let connector = MockConnector::new().connect_delay(Duration::from_millis(50));
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let req = request(json!({
        "devices": [
            device_json("r1", "ios"), device_json("r2", "ios"), device_json("r3", "ios"),
            device_json("r4", "ios"), device_json("r5", "ios"),
        ],
        "commands": ["show version", "show clock"],
    }));
    let batch = assert_ok!(orchestrator.execute(&req, &CancellationToken::new()).await);

    assert!(stats.peak_active() <= 2);
    assert_eq!(batch.succeeded_devices, 5);
    let hosts: Vec<_> = batch.results.iter().map(|r| r.hostname.as_str()).collect();
    assert_eq!(hosts, ["r1", "r2", "r3", "r4", "r5"]);
    assert_eq!(stats.closes(), 5);
}

#[tokio::test]
async fn invalid_descriptor_reports_every_device() {
    let config = ServiceConfig::default();
    let connector = MockConnector::new();
    let stats = connector.stats.clone();
    let orchestrator = Orchestrator::new(&config, connector, NoParser);

    let req = request(json!({
        "devices": [
            {"hostname": "r1", "username": "admin", "password": "x", "os": "ios", "port": 70000},
            {"hostname": "r2", "password": "x", "os": "eos"},
        ],
        "commands": ["show version"],
    }));
    let err = assert_err!(orchestrator.execute(&req, &CancellationToken::new()).await);

    match err {
        Error::Descriptor(d) => {
            assert!(d.mentions("devices[0].port"));
            assert!(d.mentions("devices[1].username"));
            assert!(d.mentions("devices[1].os"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stats.connects(), 0);
}
