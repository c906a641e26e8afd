//! Frida instrumentation of a running dynamic session.

use super::model::DynamicResponse;
use crate::{
    error::{Kind, Result},
    transport::{Payload, Transport},
    Hash,
};
use log::debug;
use reqwest::Method;
use serde_derive::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const LIST_SCRIPTS: &str = "api/v1/frida/list_scripts";
const GET_SCRIPT: &str = "api/v1/frida/get_script";
const INSTRUMENT: &str = "api/v1/frida/instrument";
const API_MONITOR: &str = "api/v1/frida/api_monitor";
const LOGS: &str = "api/v1/frida/logs";
const GET_DEPENDENCIES: &str = "api/v1/frida/get_dependencies";

wire_enum! {
    /// Target platform of a Frida script.
    pub enum Device {
        /// Android device or emulator.
        Android => "android",
        /// iOS device or simulator.
        Ios => "ios",
    }
}

wire_enum! {
    /// What an instrumentation request does.
    pub enum FridaAction {
        /// Launches the application with the hooks injected.
        Spawn => "spawn",
        /// Attaches to the running process given by its PID.
        Session => "session",
        /// Lists the candidate processes. Hooks and code are ignored.
        Ps => "ps",
    }
}

/// Catalog of the Frida scripts available for a platform.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ScriptCatalog {
    #[serde(default)]
    files: Vec<String>,
}

impl ScriptCatalog {
    /// Gets the script names.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Whether the catalog contains the given script.
    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f == name)
    }
}

/// Instrumentation request, as sent to the service.
///
/// Hooks keep the order they were added in, duplicates included. Which fields a given action
/// needs is checked by the service, not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentationRequest {
    hash: Hash,
    #[serde(serialize_with = "join_hooks")]
    default_hooks: Vec<String>,
    #[serde(serialize_with = "join_hooks")]
    auxiliary_hooks: Vec<String>,
    frida_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frida_action: Option<FridaAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
}

fn join_hooks<S>(hooks: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&hooks.join(","))
}

impl InstrumentationRequest {
    /// Creates an empty request for the given hash.
    pub fn new<H: Into<Hash>>(hash: H) -> Self {
        Self {
            hash: hash.into(),
            default_hooks: Vec::new(),
            auxiliary_hooks: Vec::new(),
            frida_code: String::new(),
            class_name: None,
            class_search: None,
            class_trace: None,
            frida_action: None,
            new_package: None,
            pid: None,
        }
    }

    /// Launches the application with the hooks injected.
    pub fn spawn<H: Into<Hash>>(hash: H) -> Self {
        Self::new(hash).action(FridaAction::Spawn)
    }

    /// Attaches to the running process with the given PID.
    pub fn attach<H: Into<Hash>>(hash: H, pid: u32) -> Self {
        Self::new(hash).action(FridaAction::Session).pid(pid)
    }

    /// Lists the candidate processes.
    pub fn list_processes<H: Into<Hash>>(hash: H) -> Self {
        Self::new(hash).action(FridaAction::Ps)
    }

    /// Appends a default hook.
    pub fn default_hook<S: Into<String>>(mut self, hook: S) -> Self {
        self.default_hooks.push(hook.into());
        self
    }

    /// Appends default hooks, in order.
    pub fn default_hooks<I, S>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_hooks.extend(hooks.into_iter().map(Into::into));
        self
    }

    /// Appends an auxiliary hook.
    pub fn auxiliary_hook<S: Into<String>>(mut self, hook: S) -> Self {
        self.auxiliary_hooks.push(hook.into());
        self
    }

    /// Appends auxiliary hooks, in order.
    pub fn auxiliary_hooks<I, S>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auxiliary_hooks
            .extend(hooks.into_iter().map(Into::into));
        self
    }

    /// Sets the free-form Frida code.
    pub fn code<S: Into<String>>(mut self, code: S) -> Self {
        self.frida_code = code.into();
        self
    }

    /// Sets the exact class to inspect.
    pub fn class_name<S: Into<String>>(mut self, class_name: S) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Sets the substring to search classes for.
    pub fn class_search<S: Into<String>>(mut self, pattern: S) -> Self {
        self.class_search = Some(pattern.into());
        self
    }

    /// Sets the class whose methods are all traced.
    pub fn class_trace<S: Into<String>>(mut self, class_name: S) -> Self {
        self.class_trace = Some(class_name.into());
        self
    }

    /// Sets the action.
    pub fn action(mut self, action: FridaAction) -> Self {
        self.frida_action = Some(action);
        self
    }

    /// Sets the package to spawn instead of the analyzed one.
    pub fn new_package<S: Into<String>>(mut self, package_name: S) -> Self {
        self.new_package = Some(package_name.into());
        self
    }

    /// Sets the PID to attach to.
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Gets the hash of the request.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Gets the action, if set.
    pub fn get_action(&self) -> Option<FridaAction> {
        self.frida_action
    }
}

/// Client of the Frida endpoints.
#[derive(Debug, Clone)]
pub struct Instrumentation {
    transport: Arc<Transport>,
}

impl Instrumentation {
    /// Creates the client on top of a shared transport.
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Gets a sub-session bound to the given hash.
    pub fn session<H: Into<Hash>>(&self, hash: H) -> InstrumentationSession {
        InstrumentationSession {
            instrumentation: self.clone(),
            hash: hash.into(),
        }
    }

    /// Lists the Frida scripts available for a platform.
    pub async fn list_scripts(&self, device: Device) -> Result<ScriptCatalog> {
        self.transport
            .fetch(
                Method::POST,
                LIST_SCRIPTS,
                Payload::Json(json!({ "device": device })),
            )
            .await
    }

    /// Gets the contents of a Frida script.
    pub async fn get_script(&self, name: &str, device: Device) -> Result<DynamicResponse> {
        self.post(GET_SCRIPT, json!({ "scripts": [name], "device": device }))
            .await
    }

    /// Sends an instrumentation request.
    ///
    /// Backend validation errors, such as a missing PID for an attach, come back unchanged.
    pub async fn instrument(&self, request: &InstrumentationRequest) -> Result<DynamicResponse> {
        debug!(
            "instrumenting {} ({})",
            request.hash(),
            request
                .get_action()
                .map_or("default action", FridaAction::as_str)
        );
        let body = serde_json::to_value(request).map_err(|e| Kind::Parse {
            message: format!("could not encode the instrumentation request: {}", e),
        })?;
        self.post(INSTRUMENT, body).await
    }

    /// Gets the API monitor output of an instrumented application.
    pub async fn api_monitor(&self, hash: &Hash) -> Result<DynamicResponse> {
        self.post(API_MONITOR, json!({ "hash": hash })).await
    }

    /// Gets the Frida logs of an instrumented application.
    pub async fn logs(&self, hash: &Hash) -> Result<DynamicResponse> {
        self.post(LOGS, json!({ "hash": hash })).await
    }

    /// Gets the runtime dependencies collected from an instrumented application.
    pub async fn runtime_dependencies(&self, hash: &Hash) -> Result<DynamicResponse> {
        self.post(GET_DEPENDENCIES, json!({ "hash": hash })).await
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<DynamicResponse> {
        self.transport
            .fetch(Method::POST, path, Payload::Json(body))
            .await
    }
}

/// Instrumentation calls bound to one hash.
#[derive(Debug, Clone)]
pub struct InstrumentationSession {
    instrumentation: Instrumentation,
    hash: Hash,
}

impl InstrumentationSession {
    /// Gets the hash of the sub-session.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Starts a request for this hash.
    pub fn request(&self) -> InstrumentationRequest {
        InstrumentationRequest::new(self.hash.clone())
    }

    /// Launches the application with the given hooks.
    pub async fn spawn<I, S>(&self, default_hooks: I) -> Result<DynamicResponse>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = InstrumentationRequest::spawn(self.hash.clone()).default_hooks(default_hooks);
        self.instrumentation.instrument(&request).await
    }

    /// Lists the candidate processes.
    pub async fn list_processes(&self) -> Result<DynamicResponse> {
        let request = InstrumentationRequest::list_processes(self.hash.clone());
        self.instrumentation.instrument(&request).await
    }

    /// Sends an instrumentation request composed by the caller.
    pub async fn instrument(&self, request: &InstrumentationRequest) -> Result<DynamicResponse> {
        self.instrumentation.instrument(request).await
    }

    /// Gets the API monitor output.
    pub async fn api_monitor(&self) -> Result<DynamicResponse> {
        self.instrumentation.api_monitor(&self.hash).await
    }

    /// Gets the Frida logs.
    pub async fn logs(&self) -> Result<DynamicResponse> {
        self.instrumentation.logs(&self.hash).await
    }

    /// Gets the runtime dependencies.
    pub async fn runtime_dependencies(&self) -> Result<DynamicResponse> {
        self.instrumentation.runtime_dependencies(&self.hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::{FridaAction, InstrumentationRequest};
    use serde_json::json;

    #[test]
    fn it_hooks_keep_order_and_duplicates() {
        let request = InstrumentationRequest::spawn("H1")
            .default_hooks(vec!["a", "b"])
            .auxiliary_hook("x")
            .auxiliary_hook("x");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["default_hooks"], json!("a,b"));
        assert_eq!(value["auxiliary_hooks"], json!("x,x"));
        assert_eq!(value["frida_action"], json!("spawn"));
    }

    #[test]
    fn it_omits_unset_fields() {
        let value = serde_json::to_value(&InstrumentationRequest::new("H1")).unwrap();
        assert_eq!(
            value,
            json!({
                "hash": "H1",
                "default_hooks": "",
                "auxiliary_hooks": "",
                "frida_code": ""
            })
        );
    }

    #[test]
    fn it_attach() {
        let request = InstrumentationRequest::attach("H1", 4242)
            .class_search("crypto")
            .new_package("com.example.other");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["pid"], json!(4242));
        assert_eq!(value["frida_action"], json!("session"));
        assert_eq!(value["class_search"], json!("crypto"));
        assert_eq!(value["new_package"], json!("com.example.other"));
        assert!(value.get("class_name").is_none());
        assert_eq!(request.get_action(), Some(FridaAction::Session));
    }
}
