//! Command surface: argument handling, reply formats and the async
//! enqueue/poll round trip.

mod common;

use std::time::{Duration, Instant};

use common::{engine_with, FakeTransport};
use transrelay::{ClientFacade, Reply};

fn facade() -> (ClientFacade, std::sync::Arc<FakeTransport>) {
    let transport = FakeTransport::new();
    let facade = ClientFacade::with_engine(engine_with(&transport));
    (facade, transport)
}

fn text(reply: Reply) -> String {
    match reply {
        Reply::Text(s) => s,
        Reply::Number(n) => panic!("expected text, got number {n}"),
    }
}

fn poll_until_ready(facade: &ClientFacade) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let line = facade.poll();
        if !line.is_empty() {
            return line;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("no outcome within deadline");
}

// ==================== Basic commands ====================

#[test]
fn ping_pongs() {
    let (facade, _) = facade();
    assert_eq!(text(facade.handle(&["ping"])), "pong");
}

#[test]
fn version_names_the_crate() {
    let (facade, _) = facade();
    let version = text(facade.handle(&["version"]));
    assert!(version.starts_with("transrelay v"), "{version}");
}

#[test]
fn missing_and_unknown_subcommands() {
    let (facade, _) = facade();
    assert_eq!(text(facade.handle(&[])), "error|no subcommand specified");
    assert_eq!(text(facade.handle(&["dance"])), "error|unknown command: dance");
}

#[test]
fn status_reports_readiness_and_pending() {
    let (facade, _) = facade();
    assert_eq!(
        text(facade.handle(&["status"])),
        "Status: Active, Translator Not Ready, Server: https://fake.test:443, Pending: 0"
    );
    assert_eq!(text(facade.handle(&["setkey", "WT-key"])), "ok");
    assert!(text(facade.handle(&["status"])).contains("Translator Ready"));
}

#[test]
fn status_includes_credits_once_known() {
    let (facade, transport) = facade();
    transport.push_reply(r#"{"translation":"hi","creditsRemaining":1234.7}"#);
    facade.handle(&["setkey", "WT-key"]);
    facade.handle(&["translate", "你好"]);
    assert!(text(facade.handle(&["status"])).ends_with(", Credits: 1234 cents"));
}

// ==================== setkey / credits ====================

#[test]
fn setkey_requires_argument() {
    let (facade, _) = facade();
    assert_eq!(text(facade.handle(&["setkey"])), "error|API key required");
}

#[test]
fn setkey_reports_initialization_failure() {
    let (facade, transport) = facade();
    transport.set_fail_open(true);
    assert_eq!(
        text(facade.handle(&["setkey", "WT-key"])),
        "error|initialization failed"
    );
    assert!(!facade.engine().is_ready());
}

#[test]
fn credits_unknown_until_reported() {
    let (facade, transport) = facade();
    assert_eq!(facade.handle(&["credits"]), Reply::Text("unknown".into()));

    transport.push_reply(r#"{"translation":"hello","creditsRemaining":42}"#);
    facade.handle(&["setkey", "WT-key"]);
    facade.handle(&["translate", "你好"]);
    assert_eq!(facade.handle(&["credits"]), Reply::Number(42.0));
}

// ==================== Synchronous translate ====================

#[test]
fn translate_argument_errors() {
    let (facade, _) = facade();
    assert_eq!(text(facade.handle(&["translate"])), "error|text required");
    assert_eq!(
        text(facade.handle(&["translate", "你好"])),
        "error|translator not initialized"
    );
}

#[test]
fn translate_returns_translation_or_error_kind() {
    let (facade, transport) = facade();
    transport.push_reply(r#"{"translation":"hello"}"#);
    transport.push_reply("");
    transport.push_reply(r#"{"error":"Insufficient credits"}"#);
    facade.handle(&["setkey", "WT-key"]);

    assert_eq!(text(facade.handle(&["translate", "你好"])), "hello");
    assert_eq!(text(facade.handle(&["translate", "再见"])), "error|network error");
    assert_eq!(text(facade.handle(&["translate", "谢谢"])), "error|API error");
    assert_eq!(text(facade.handle(&["translate", ""])), "error|invalid parameters");
}

#[test]
fn translate_uses_default_pair_unless_both_given() {
    let (facade, transport) = facade();
    facade.handle(&["setkey", "WT-key"]);

    facade.handle(&["translate", "one"]);
    facade.handle(&["translate", "two", "de"]);
    facade.handle(&["translate", "three", "de", "fr"]);

    let pairs: Vec<(String, String)> = transport
        .bodies()
        .iter()
        .map(|b| {
            let v: serde_json::Value = serde_json::from_str(b).unwrap();
            (v["from"].as_str().unwrap().to_string(), v["to"].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(
        pairs,
        [
            ("zh".to_string(), "en".to_string()),
            ("zh".to_string(), "en".to_string()),
            ("de".to_string(), "fr".to_string()),
        ]
    );
}

// ==================== Async translate / poll ====================

#[test]
fn translate_async_argument_errors() {
    let (facade, _) = facade();
    assert_eq!(
        text(facade.handle(&["translate_async", "1"])),
        "error|requestId and text required"
    );
    assert_eq!(
        text(facade.handle(&["translate_async", "1", "你好"])),
        "error|translator not initialized"
    );
    facade.handle(&["setkey", "WT-key"]);
    assert_eq!(
        text(facade.handle(&["translate_async", "1", ""])),
        "error|empty text"
    );
}

#[test]
fn poll_is_empty_when_nothing_ready() {
    let (facade, _) = facade();
    assert_eq!(text(facade.handle(&["poll"])), "");
}

#[test]
fn async_round_trip_line_format() {
    let (facade, transport) = facade();
    transport.push_reply(r#"{"translation":"hello","creditsRemaining":42}"#);
    facade.handle(&["setkey", "WT-key"]);

    assert_eq!(text(facade.handle(&["translate_async", "req-1", "你好", "zh", "en"])), "ok");
    assert_eq!(poll_until_ready(&facade), "req-1|hello||42");
    assert_eq!(text(facade.handle(&["poll"])), "");
}

#[test]
fn async_failure_line_format() {
    let (facade, transport) = facade();
    transport.push_reply(r#"{"error":"Insufficient credits"}"#);
    facade.handle(&["setkey", "WT-key"]);

    facade.handle(&["translate_async", "req-2", "你好"]);
    assert_eq!(poll_until_ready(&facade), "req-2||INSUFFICIENT_CREDITS|");
}

#[test]
fn reply_display() {
    assert_eq!(Reply::Text("ok".into()).to_string(), "ok");
    assert_eq!(Reply::Number(42.0).to_string(), "42");
    assert_eq!(Reply::Number(0.5).to_string(), "0.5");
}
