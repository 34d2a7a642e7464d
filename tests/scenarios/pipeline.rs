//! Producer to consumer through a configured orchestrator

use crate::common::{wait_for, BodyDrivenHandler};
use orchestrator::app::config::OrchestratorConfig;
use orchestrator::app::orchestrator::Orchestrator;
use orchestrator::consumer::api::MessageHandler;
use orchestrator::core::shutdown::ShutdownCoordinator;
use orchestrator::core::time::system_clock;
use orchestrator::notifications::api::{Event, EventFilter, QueueEventType};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const CONFIG: &str = r#"
topic = "Orders"

[producer]
attribute_fields = ["eventType", "region"]

[[queues]]
name = "Invoices"
max_receive_count = 3
dead_letter_queue = "Parked"

[[queues]]
name = "Shipping"
max_receive_count = 1

[[queues]]
name = "Parked"

[[subscriptions]]
queue = "Invoices"
filter = { eventType = ["invoice"] }

[[subscriptions]]
queue = "Shipping"
filter = { eventType = ["shipment"], region = ["eu", "us"] }

[[consumers]]
group = "Billing"
queue = "Invoices"

[[consumers]]
group = "Logistics"
queue = "Shipping"
batch_size = 1

[runner]
handler_timeout_ms = 500

[runner.backoff]
initial_delay_ms = 5
max_delay_ms = 20

[alarm]
threshold = 2
"#;

#[tokio::test]
async fn test_configured_pipeline_end_to_end() {
    let config = OrchestratorConfig::from_toml_str(CONFIG).unwrap();
    let handler = Arc::new(BodyDrivenHandler::default());
    let orchestrator = Orchestrator::build_with_handlers(config, system_clock(), |_| {
        Arc::clone(&handler) as Arc<dyn MessageHandler>
    })
    .unwrap();
    let mut queue_events = orchestrator
        .notifications()
        .subscribe(
            "operator".to_string(),
            EventFilter::QueueOnly,
            "pipeline test".to_string(),
        )
        .unwrap();
    let shutdown = ShutdownCoordinator::new();
    let running = orchestrator.start(&shutdown);
    let producer = orchestrator.producer();

    let events = [
        json!({"eventType": "invoice", "id": 1}),
        json!({"eventType": "invoice", "id": 2, "action": "fail"}),
        json!({"eventType": "shipment", "region": "eu", "id": 3}),
        json!({"eventType": "shipment", "region": "apac", "id": 4}),
        json!({"eventType": "shipment", "region": "us", "id": 5, "action": "fail"}),
    ];
    for event in &events {
        assert!(producer.handle_event(event).is_success());
    }

    wait_for(Duration::from_secs(5), || orchestrator.is_idle()).await;
    shutdown.trigger_shutdown();
    let reports = running.join().await;

    let billing = reports[0].result.as_ref().unwrap();
    assert_eq!(reports[0].group, "Billing");
    assert_eq!(billing.succeeded, 1);
    assert_eq!(billing.failed, 3);
    assert_eq!(billing.dead_lettered, 1);
    let logistics = reports[1].result.as_ref().unwrap();
    assert_eq!(logistics.succeeded, 1);
    assert_eq!(logistics.undeliverable, 1);

    let parked = orchestrator.dead_letter_report().unwrap();
    assert_eq!(parked[0].queue_id, "Parked");
    assert_eq!(parked[0].messages.len(), 1);
    let body: serde_json::Value =
        serde_json::from_slice(&parked[0].messages[0].body).unwrap();
    assert_eq!(body["id"], 2);

    let mut seen = Vec::new();
    while let Ok(Event::Queue(event)) = queue_events.try_recv() {
        seen.push((event.queue_id, event.event_type));
    }
    assert!(seen.contains(&("Invoices".to_string(), QueueEventType::DeadLettered)));
    assert!(seen.contains(&("Shipping".to_string(), QueueEventType::Undeliverable)));

    let alerts = orchestrator.alarms().evaluate().unwrap();
    let fired: Vec<&str> = alerts.iter().map(|a| a.consumer_group.as_str()).collect();
    assert_eq!(fired, vec!["Billing"]);
}
