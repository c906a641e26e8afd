//! Tests for the dynamic analysis session and its instrumentation.

use super::{
    ActivityTest, Device, DynamicAnalyzer, DynamicSourceKind, FridaAction, InstrumentationRequest,
    ProxyAction, RootCaAction,
};
use crate::{
    mock::{MockReply, MockServer, Recorded},
    Client, Hash,
};
use serde_json::{json, Value};
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

/// Dynamic side of the analysis service, kept in memory.
#[derive(Default)]
struct Backend {
    running: BTreeSet<String>,
    reported: BTreeSet<String>,
    installs: u32,
    ca_installed: bool,
}

impl Backend {
    fn handle(&mut self, request: &Recorded) -> MockReply {
        let body = request.json();
        let hash = body["hash"].as_str().unwrap_or_default().to_owned();

        match request.endpoint() {
            "dynamic/get_apps" => MockReply::json(
                200,
                json!({
                    "apks": [{
                        "MD5": "H1",
                        "APP_NAME": "Diva",
                        "VERSION_NAME": "1.0",
                        "FILE_NAME": "diva.apk",
                        "PACKAGE_NAME": "jakhar.aseem.diva",
                        "DYNAMIC_REPORT_EXISTS": false
                    }],
                    "identifier": "emulator-5554",
                    "proxy_ip": "10.0.2.2",
                    "proxy_port": 1337,
                    "title": "MobSF Dynamic Analysis",
                    "version": "v4.0.0"
                }),
            ),
            "dynamic/start_analysis" => {
                if hash != "H1" {
                    return MockReply::json(400, json!({"error": "Invalid Parameters"}));
                }
                if self.running.contains(&hash) {
                    return MockReply::json(
                        200,
                        json!({"status": "failed", "message": "Dynamic analysis is already running"}),
                    );
                }
                if body["install"] == 1 {
                    self.installs += 1;
                }
                let _ = self.running.insert(hash);
                MockReply::json(200, json!({"status": "ok", "screen_witdth": 1080}))
            }
            "dynamic/stop_analysis" => {
                if self.running.remove(&hash) {
                    let _ = self.reported.insert(hash);
                }
                MockReply::json(200, json!({"status": "ok"}))
            }
            "dynamic/report_json" => {
                if self.reported.contains(&hash) {
                    MockReply::json(200, json!({"hash": hash, "tls_tests": {"tls_misconfigured": false}}))
                } else {
                    MockReply::json(404, json!({"error": "Dynamic analysis report not found"}))
                }
            }
            "dynamic/view_source" => MockReply::json(
                200,
                json!({"data": "<map/>", "file": body["file"], "type": body["type"], "sql_dump": {}}),
            ),
            "android/tls_tests" | "android/activity" => {
                if self.running.contains(&hash) {
                    MockReply::json(200, json!({"status": "ok", "message": "Test completed"}))
                } else {
                    MockReply::json(
                        200,
                        json!({"status": "failed", "message": "Dynamic analysis is not running"}),
                    )
                }
            }
            "android/logcat" => MockReply::json(200, json!({"status": "ok", "data": "I/ActivityManager: Start proc"})),
            "android/mobsfy" => MockReply::json(200, json!({"status": "ok", "android_version": 11})),
            "android/root_ca" => {
                self.ca_installed = body["action"] == "install";
                MockReply::json(200, json!({"status": "ok", "action": body["action"]}))
            }
            "android/global_proxy" => {
                MockReply::json(200, json!({"status": "ok", "action": body["action"]}))
            }
            "frida/list_scripts" => {
                let files = if body["device"] == "ios" {
                    json!(["ios_keychain_dump"])
                } else {
                    json!(["hook_java_reflection", "ssl_pinning_bypass"])
                };
                MockReply::json(200, json!({"status": "ok", "files": files}))
            }
            "frida/get_script" => MockReply::json(
                200,
                json!({"status": "ok", "content": format!("// {}", body["scripts"][0].as_str().unwrap_or_default())}),
            ),
            "frida/instrument" => match body["frida_action"].as_str() {
                Some("ps") => MockReply::json(
                    200,
                    json!({"status": "ok", "message": [{"pid": 4242, "name": "jakhar.aseem.diva"}]}),
                ),
                Some("session") if body.get("pid").is_none() => MockReply::json(
                    200,
                    json!({"status": "failed", "message": "Missing parameter: pid"}),
                ),
                _ => MockReply::json(200, json!({"status": "ok", "message": "ok"})),
            },
            "frida/api_monitor" | "frida/logs" | "frida/get_dependencies" => {
                MockReply::json(200, json!({"status": "ok", "data": []}))
            }
            _ => MockReply::json(404, json!({"error": "Not Found"})),
        }
    }
}

fn start() -> (MockServer, DynamicAnalyzer, Arc<Mutex<Backend>>) {
    let backend = Arc::new(Mutex::new(Backend::default()));
    let state = Arc::clone(&backend);
    let server = MockServer::start(move |request| state.lock().unwrap().handle(request));
    let analyzer = Client::new(&server.config()).unwrap().dynamic_analyzer();
    (server, analyzer, backend)
}

#[tokio::test]
async fn it_lifecycle_in_order() {
    let (server, analyzer, backend) = start();

    let apps = analyzer.apps().await.unwrap();
    assert_eq!(server.last().method, "GET");
    let hash = apps.apps()[0].hash().clone();
    assert_eq!(apps.identifier(), "emulator-5554");

    let session = analyzer.session(hash.clone());
    assert!(session.start(true, true).await.unwrap().is_ok());
    let body = server.last().json();
    assert_eq!(body, json!({"hash": "H1", "re_install": 1, "install": 1}));
    assert!(server
        .last()
        .header("content-type")
        .unwrap()
        .starts_with("application/json"));

    let tls = session.tls_tests().await.unwrap();
    assert_eq!(tls.message(), Some("Test completed"));
    let _ = session.stop().await.unwrap();

    let report = session.report().await.unwrap();
    assert_eq!(report.hash(), Some("H1"));
    assert_eq!(backend.lock().unwrap().installs, 1);

    let endpoints: Vec<String> = server
        .requests()
        .iter()
        .map(|r| r.endpoint().to_owned())
        .collect();
    assert_eq!(
        endpoints,
        vec![
            "dynamic/get_apps",
            "dynamic/start_analysis",
            "android/tls_tests",
            "dynamic/stop_analysis",
            "dynamic/report_json",
        ]
    );
}

#[tokio::test]
async fn it_flags_are_sent_as_numbers() {
    let (server, analyzer, backend) = start();

    let _ = analyzer
        .start_analysis(&Hash::new("H1"), false, false)
        .await
        .unwrap();
    assert_eq!(server.last().json()["re_install"], json!(0));
    assert_eq!(server.last().json()["install"], json!(0));
    assert_eq!(backend.lock().unwrap().installs, 0);
}

#[tokio::test]
async fn it_start_twice_is_rejected() {
    let (_server, analyzer, _) = start();
    let hash = Hash::new("H1");

    let _ = analyzer.start_analysis(&hash, false, true).await.unwrap();
    let error = analyzer.start_analysis(&hash, false, true).await.unwrap_err();
    assert!(error.is_backend_rejection());
    assert!(!error.is_transport_failure());
    assert_eq!(error.message(), "Dynamic analysis is already running");
}

#[tokio::test]
async fn it_out_of_order_calls_reach_the_service() {
    let (server, analyzer, _) = start();
    let hash = Hash::new("H1");

    let error = analyzer.tls_tests(&hash).await.unwrap_err();
    assert!(error.is_backend_rejection());
    assert_eq!(server.last().endpoint(), "android/tls_tests");

    let error = analyzer.report(&hash).await.unwrap_err();
    assert!(error.is_not_found());

    let error = analyzer
        .start_analysis(&Hash::new("unknown"), false, true)
        .await
        .unwrap_err();
    assert_eq!(error.message(), "Invalid Parameters");
}

#[tokio::test]
async fn it_stop_twice_and_report_twice() {
    let (_server, analyzer, _) = start();
    let session = analyzer.session("H1");

    let _ = session.start(false, true).await.unwrap();
    assert!(session.stop().await.unwrap().is_ok());
    assert!(session.stop().await.unwrap().is_ok());

    let first = session.report().await.unwrap();
    let second = session.report().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn it_device_probes() {
    let (server, analyzer, backend) = start();
    let hash = Hash::new("H1");

    let logcat = analyzer.logcat("jakhar.aseem.diva").await.unwrap();
    assert!(logcat.data().is_some());
    assert_eq!(server.last().json(), json!({"package": "jakhar.aseem.diva"}));

    let mobsfy = analyzer.mobsfy("emulator-5554").await.unwrap();
    assert_eq!(mobsfy.get("android_version"), Some(&json!(11)));

    let _ = analyzer.root_ca(RootCaAction::Install).await.unwrap();
    let _ = analyzer.root_ca(RootCaAction::Install).await.unwrap();
    assert!(backend.lock().unwrap().ca_installed);
    let _ = analyzer.root_ca(RootCaAction::Remove).await.unwrap();
    assert!(!backend.lock().unwrap().ca_installed);

    let proxy = analyzer.global_proxy(ProxyAction::Unset).await.unwrap();
    assert_eq!(proxy.get("action"), Some(&json!("unset")));

    let _ = analyzer.start_analysis(&hash, false, true).await.unwrap();
    let _ = analyzer
        .activity_test(&hash, ActivityTest::Exported)
        .await
        .unwrap();
    assert_eq!(server.last().json()["test"], json!("exported"));

    let file = analyzer
        .view_source(&hash, "shared_prefs/jakhar.aseem.diva_preferences.xml", DynamicSourceKind::Xml)
        .await
        .unwrap();
    assert_eq!(file.kind(), "xml");
    assert_eq!(file.file(), "shared_prefs/jakhar.aseem.diva_preferences.xml");
}

#[tokio::test]
async fn it_instrumentation_scripts() {
    let (server, analyzer, _) = start();
    let frida = analyzer.instrumentation();

    let android = frida.list_scripts(Device::Android).await.unwrap();
    assert!(android.contains("ssl_pinning_bypass"));
    let ios = frida.list_scripts(Device::Ios).await.unwrap();
    assert_eq!(ios.files(), &["ios_keychain_dump".to_owned()][..]);

    let script = frida
        .get_script("ssl_pinning_bypass", Device::Android)
        .await
        .unwrap();
    assert_eq!(script.get("content"), Some(&json!("// ssl_pinning_bypass")));
    assert_eq!(
        server.last().json(),
        json!({"scripts": ["ssl_pinning_bypass"], "device": "android"})
    );
}

#[tokio::test]
async fn it_instrumentation_forwards_requests() {
    let (server, analyzer, _) = start();
    let session = analyzer.session("H1");
    let frida = session.instrumentation();

    let _ = frida.spawn(vec!["api_monitor", "ssl_pinning_bypass"]).await.unwrap();
    let body = server.last().json();
    assert_eq!(body["default_hooks"], json!("api_monitor,ssl_pinning_bypass"));
    assert_eq!(body["auxiliary_hooks"], json!(""));
    assert_eq!(body["frida_action"], json!("spawn"));
    assert!(body.get("pid").is_none());

    let processes = frida.list_processes().await.unwrap();
    assert_eq!(server.last().json()["frida_action"], json!("ps"));
    assert!(processes.is_ok());
    assert!(processes.message().is_none());

    let request = frida
        .request()
        .action(FridaAction::Session)
        .auxiliary_hooks(vec!["enum_class", "enum_class"]);
    let error = frida.instrument(&request).await.unwrap_err();
    assert!(error.is_backend_rejection());
    assert_eq!(error.message(), "Missing parameter: pid");
    assert_eq!(
        server.last().json()["auxiliary_hooks"],
        json!("enum_class,enum_class")
    );

    let attach = InstrumentationRequest::attach("H1", 4242).default_hook("api_monitor");
    assert!(frida.instrument(&attach).await.unwrap().is_ok());
    assert_eq!(server.last().json()["pid"], json!(4242));

    for _ in 0..2 {
        let _ = frida.api_monitor().await.unwrap();
        let _ = frida.logs().await.unwrap();
    }
    let dependencies = frida.runtime_dependencies().await.unwrap();
    assert_eq!(dependencies.data(), Some(&Value::Array(Vec::new())));
    assert_eq!(server.last().endpoint(), "frida/get_dependencies");
    assert_eq!(server.last().json(), json!({"hash": "H1"}));
}
