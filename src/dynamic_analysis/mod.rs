//! Dynamic analysis session.
//!
//! A dynamic session of an uploaded package moves through
//! `NotStarted → Running → Stopped → Reported` on the service:
//!
//! * [`DynamicAnalyzer::start_analysis`] installs the application as configured and runs it.
//! * The runtime probes (logcat, activity and TLS tests) and the Frida instrumentation are
//!   valid while the session runs.
//! * [`DynamicAnalyzer::stop_analysis`] stops it, and stopping twice is harmless.
//! * [`DynamicAnalyzer::report`] fetches the report of a stopped session, as many times as
//!   needed.
//!
//! The client never tracks nor enforces this order. Out of order calls reach the service,
//! which rejects them; the rejection comes back as a backend rejection, never as a transport
//! failure. Calls for the same hash are not serialized either.

pub mod instrumentation;
pub mod model;
#[cfg(test)]
mod tests;

use crate::{
    error::Result,
    static_analysis::{Report, SourceFile},
    transport::{Payload, Transport},
    Hash,
};
use log::info;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;

pub use self::instrumentation::{
    Device, FridaAction, Instrumentation, InstrumentationRequest, InstrumentationSession,
    ScriptCatalog,
};
pub use self::model::{
    ActivityTest, AppsSnapshot, DeviceApp, DynamicResponse, DynamicSourceKind, ProxyAction,
    RootCaAction,
};

const GET_APPS: &str = "api/v1/dynamic/get_apps";
const START_ANALYSIS: &str = "api/v1/dynamic/start_analysis";
const STOP_ANALYSIS: &str = "api/v1/dynamic/stop_analysis";
const REPORT_JSON: &str = "api/v1/dynamic/report_json";
const VIEW_SOURCE: &str = "api/v1/dynamic/view_source";
const LOGCAT: &str = "api/v1/android/logcat";
const MOBSFY: &str = "api/v1/android/mobsfy";
const ROOT_CA: &str = "api/v1/android/root_ca";
const GLOBAL_PROXY: &str = "api/v1/android/global_proxy";
const ACTIVITY: &str = "api/v1/android/activity";
const TLS_TESTS: &str = "api/v1/android/tls_tests";

/// Client of the dynamic analysis endpoints.
#[derive(Debug, Clone)]
pub struct DynamicAnalyzer {
    transport: Arc<Transport>,
}

impl DynamicAnalyzer {
    /// Creates the analyzer on top of a shared transport.
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Gets a session bound to the given hash.
    pub fn session<H: Into<Hash>>(&self, hash: H) -> DynamicSession<'_> {
        DynamicSession {
            analyzer: self,
            hash: hash.into(),
        }
    }

    /// Gets the Frida instrumentation client.
    pub fn instrumentation(&self) -> Instrumentation {
        Instrumentation::new(Arc::clone(&self.transport))
    }

    /// Lists the instrumentable applications along with device and proxy information.
    ///
    /// Callers are expected to look the device up here before starting an analysis.
    pub async fn apps(&self) -> Result<AppsSnapshot> {
        self.transport
            .fetch(Method::GET, GET_APPS, Payload::Empty)
            .await
    }

    /// Starts the dynamic analysis of an application.
    ///
    /// With `install` unset the application already on the device is used as it is. With
    /// `re_install` set, a present application is removed and installed again.
    pub async fn start_analysis(
        &self,
        hash: &Hash,
        re_install: bool,
        install: bool,
    ) -> Result<DynamicResponse> {
        let body = json!({
            "hash": hash,
            "re_install": u8::from(re_install),
            "install": u8::from(install),
        });
        let response = self.post(START_ANALYSIS, body).await?;
        info!("dynamic analysis of {} started", hash);
        Ok(response)
    }

    /// Stops the dynamic analysis of an application. Stopping a stopped session is a no-op.
    pub async fn stop_analysis(&self, hash: &Hash) -> Result<DynamicResponse> {
        let response = self.post(STOP_ANALYSIS, json!({ "hash": hash })).await?;
        info!("dynamic analysis of {} stopped", hash);
        Ok(response)
    }

    /// Gets the dynamic analysis report. It is fetched again on each call, never re-run.
    pub async fn report(&self, hash: &Hash) -> Result<Report> {
        self.transport
            .fetch(
                Method::POST,
                REPORT_JSON,
                Payload::Json(json!({ "hash": hash })),
            )
            .await
    }

    /// Gets a file captured during the dynamic analysis.
    ///
    /// The path is sent exactly as given; the service checks it for traversal.
    pub async fn view_source(
        &self,
        hash: &Hash,
        file: &str,
        kind: DynamicSourceKind,
    ) -> Result<SourceFile> {
        self.transport
            .fetch(
                Method::POST,
                VIEW_SOURCE,
                Payload::Json(json!({ "hash": hash, "file": file, "type": kind })),
            )
            .await
    }

    /// Gets the logcat output of an application package.
    pub async fn logcat(&self, package_name: &str) -> Result<DynamicResponse> {
        self.post(LOGCAT, json!({ "package": package_name })).await
    }

    /// Prepares a device or emulator for dynamic analysis.
    pub async fn mobsfy(&self, identifier: &str) -> Result<DynamicResponse> {
        self.post(MOBSFY, json!({ "identifier": identifier })).await
    }

    /// Installs or removes the interception root CA. Repeating an action is harmless.
    pub async fn root_ca(&self, action: RootCaAction) -> Result<DynamicResponse> {
        self.post(ROOT_CA, json!({ "action": action })).await
    }

    /// Sets or unsets the global HTTP proxy of the device. Repeating an action is harmless.
    pub async fn global_proxy(&self, action: ProxyAction) -> Result<DynamicResponse> {
        self.post(GLOBAL_PROXY, json!({ "action": action })).await
    }

    /// Runs an activity tester on a running session.
    pub async fn activity_test(&self, hash: &Hash, test: ActivityTest) -> Result<DynamicResponse> {
        self.post(ACTIVITY, json!({ "hash": hash, "test": test }))
            .await
    }

    /// Runs the TLS/SSL security tests on a running session.
    pub async fn tls_tests(&self, hash: &Hash) -> Result<DynamicResponse> {
        self.post(TLS_TESTS, json!({ "hash": hash })).await
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<DynamicResponse> {
        self.transport
            .fetch(Method::POST, path, Payload::Json(body))
            .await
    }
}

/// Dynamic analysis calls bound to one hash.
///
/// The session is only a convenience that threads the hash through the calls; it holds no
/// state and does not check the order of the calls.
#[derive(Debug, Clone)]
pub struct DynamicSession<'a> {
    analyzer: &'a DynamicAnalyzer,
    hash: Hash,
}

impl<'a> DynamicSession<'a> {
    /// Gets the hash of the session.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Starts the analysis. See [`DynamicAnalyzer::start_analysis`].
    pub async fn start(&self, re_install: bool, install: bool) -> Result<DynamicResponse> {
        self.analyzer
            .start_analysis(&self.hash, re_install, install)
            .await
    }

    /// Stops the analysis.
    pub async fn stop(&self) -> Result<DynamicResponse> {
        self.analyzer.stop_analysis(&self.hash).await
    }

    /// Gets the report.
    pub async fn report(&self) -> Result<Report> {
        self.analyzer.report(&self.hash).await
    }

    /// Runs an activity tester.
    pub async fn activity_test(&self, test: ActivityTest) -> Result<DynamicResponse> {
        self.analyzer.activity_test(&self.hash, test).await
    }

    /// Runs the TLS/SSL security tests.
    pub async fn tls_tests(&self) -> Result<DynamicResponse> {
        self.analyzer.tls_tests(&self.hash).await
    }

    /// Gets a captured file.
    pub async fn view_source(&self, file: &str, kind: DynamicSourceKind) -> Result<SourceFile> {
        self.analyzer.view_source(&self.hash, file, kind).await
    }

    /// Gets the Frida instrumentation sub-session.
    pub fn instrumentation(&self) -> InstrumentationSession {
        self.analyzer
            .instrumentation()
            .session(self.hash.clone())
    }
}
