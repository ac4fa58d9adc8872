//! ToolDispatcher - routes model tool calls to the sandboxed tools

use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::llm::{ToolCall, ToolDefinition};

use super::builtin::{ListDirectoryTool, ReadFileTool, RunScriptTool, WriteFileTool};
use super::confine::{confine, resolve_root};
use super::{Access, SandboxSettings, Tool, ToolContext, ToolError, ToolName, ToolResult};

/// Argument key naming the working root; must stay under the configured root
pub const WORKING_DIRECTORY_KEY: &str = "working_directory";

/// Dispatches tool calls by name and turns every outcome into a `ToolResult`
pub struct ToolDispatcher {
    settings: SandboxSettings,
    verbose: bool,
    list: ListDirectoryTool,
    read: ReadFileTool,
    write: WriteFileTool,
    run: RunScriptTool,
}

impl ToolDispatcher {
    pub fn new(settings: SandboxSettings) -> Self {
        debug!(?settings, "ToolDispatcher::new: called");
        Self {
            read: ReadFileTool::new(settings.max_chars),
            run: RunScriptTool::new(settings.script.clone()),
            list: ListDirectoryTool,
            write: WriteFileTool,
            verbose: false,
            settings,
        }
    }

    /// Include call arguments in the per-call log line
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Tool definitions advertised to the model, in a stable order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolDispatcher::definitions: called");
        ToolName::ALL.into_iter().map(|name| self.definition(name)).collect()
    }

    pub fn definition(&self, name: ToolName) -> ToolDefinition {
        match name {
            ToolName::GetFilesInfo => describe(&self.list),
            ToolName::GetFileContent => describe(&self.read),
            ToolName::WriteFile => describe(&self.write),
            ToolName::RunScriptFile => describe(&self.run),
        }
    }

    /// Execute a tool call; never panics and never returns early with an error
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        debug!(tool_name = %call.name, tool_id = %call.id, "ToolDispatcher::dispatch: called");
        let name = match call.name.parse::<ToolName>() {
            Ok(name) => name,
            Err(e) => {
                warn!(tool_name = %call.name, "Model called an unknown tool");
                return e.into();
            }
        };

        if self.verbose {
            info!(tool = %name, args = %call.input, "Calling function");
        } else {
            info!(tool = %name, "Calling function");
        }

        let result = guarded(self.invoke(name, call.input.clone())).await;
        debug!(tool = %name, is_error = result.is_error(), "ToolDispatcher::dispatch: finished");
        result
    }

    /// Execute tool calls in order, pairing each result with its call id
    ///
    /// `on_call` sees each call just before it runs.
    pub async fn dispatch_all<F>(&self, calls: &[ToolCall], mut on_call: F) -> Vec<(String, ToolResult)>
    where
        F: FnMut(&ToolCall),
    {
        debug!(count = %calls.len(), "ToolDispatcher::dispatch_all: called");
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            on_call(call);
            let result = self.dispatch(call).await;
            results.push((call.id.clone(), result));
        }

        results
    }

    async fn invoke(&self, name: ToolName, input: Value) -> Result<String, ToolError> {
        let (requested, args) = split_arguments(input)?;
        match name {
            ToolName::GetFilesInfo => self.call(&self.list, requested, args).await,
            ToolName::GetFileContent => self.call(&self.read, requested, args).await,
            ToolName::WriteFile => self.call(&self.write, requested, args).await,
            ToolName::RunScriptFile => self.call(&self.run, requested, args).await,
        }
    }

    /// Validate arguments, resolve the working root, then run the tool
    async fn call<T: Tool>(
        &self,
        tool: &T,
        requested: Option<String>,
        args: Map<String, Value>,
    ) -> Result<String, ToolError> {
        let args: T::Args = serde_json::from_value(Value::Object(args)).map_err(|e| {
            debug!(tool = %tool.name(), %e, "ToolDispatcher::call: argument validation failed");
            ToolError::InvalidArguments(e.to_string())
        })?;

        let root = self.working_root(requested, access(tool.name()))?;
        let ctx = ToolContext::resolve(&root, self.settings.project_root.as_deref()).await?;
        tool.run(args, &ctx).await
    }

    /// The configured root, or a caller-named directory confined beneath it
    fn working_root(&self, requested: Option<String>, access: Access) -> Result<PathBuf, ToolError> {
        let Some(requested) = requested else {
            return Ok(self.settings.default_root.clone());
        };

        let default_root = &self.settings.default_root;
        let base = resolve_root(default_root, self.settings.project_root.as_deref()).map_err(|e| {
            debug!(%e, "ToolDispatcher::working_root: could not make default root absolute");
            ToolError::MissingRoot {
                root: default_root.clone(),
            }
        })?;

        confine(&base, &requested).map_err(|e| {
            warn!(%requested, "Model named a working directory outside the sandbox");
            e.with_access(access)
        })
    }
}

/// The access a tool performs, for confinement messages
fn access(name: ToolName) -> Access {
    match name {
        ToolName::GetFilesInfo => Access::List,
        ToolName::GetFileContent => Access::Read,
        ToolName::WriteFile => Access::Write,
        ToolName::RunScriptFile => Access::Execute,
    }
}

fn describe<T: Tool>(tool: &T) -> ToolDefinition {
    ToolDefinition::new(tool.name().as_str(), tool.description(), tool.input_schema())
}

/// Separate a requested working directory from the tool's own arguments
///
/// An object without one leaves the choice to the configured default. Any
/// other value is taken as a bare working directory, which older callers send
/// positionally.
fn split_arguments(input: Value) -> Result<(Option<String>, Map<String, Value>), ToolError> {
    let (root, args) = match input {
        Value::Object(mut map) => {
            let root = map.remove(WORKING_DIRECTORY_KEY);
            (root, map)
        }
        other => {
            debug!(?other, "split_arguments: positional working directory");
            (Some(other), Map::new())
        }
    };

    let root = match root {
        None => None,
        Some(Value::String(root)) => Some(root),
        Some(other) => {
            return Err(ToolError::InvalidArguments(format!(
                "{} must be a string, got {}",
                WORKING_DIRECTORY_KEY, other
            )));
        }
    };

    Ok((root, args))
}

/// Run a tool future, converting a panic into an internal error
async fn guarded<F>(fut: F) -> ToolResult
where
    F: Future<Output = Result<String, ToolError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result.into(),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(%message, "Tool panicked");
            ToolError::Internal(message).into()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FailureKind, ScriptSettings};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn dispatcher(root: &Path) -> ToolDispatcher {
        let script = ScriptSettings {
            interpreter: "sh".to_string(),
            extension: "sh".to_string(),
            label: "shell".to_string(),
            timeout: Duration::from_secs(10),
        };
        ToolDispatcher::new(SandboxSettings::new(root).with_max_chars(100).with_script(script))
    }

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let temp = tempdir().unwrap();
        let defs = dispatcher(temp.path()).definitions();

        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["get_files_info", "get_file_content", "write_file", "run_script_file"]
        );
        assert!(defs.iter().all(|d| d.input_schema["type"] == "object"));
    }

    #[test]
    fn test_read_description_mentions_cap() {
        let temp = tempdir().unwrap();
        let def = dispatcher(temp.path()).definition(ToolName::GetFileContent);
        assert!(def.description.contains("100 characters"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let temp = tempdir().unwrap();
        let result = dispatcher(temp.path()).dispatch(&call("rm_rf", serde_json::json!({}))).await;

        assert_eq!(result.kind(), Some(FailureKind::UnknownTool));
        assert_eq!(result.to_payload(), serde_json::json!({"error": "Unknown function: rm_rf"}));
    }

    #[tokio::test]
    async fn test_dispatch_injects_default_root() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("main.py"), "print(1)").unwrap();

        let result = dispatcher(temp.path())
            .dispatch(&call("get_file_content", serde_json::json!({"file_path": "main.py"})))
            .await;

        assert_eq!(result, ToolResult::success("print(1)"));
    }

    #[tokio::test]
    async fn test_dispatch_working_directory_below_root() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("pkg")).unwrap();
        fs::write(temp.path().join("pkg").join("only-here.txt"), "x").unwrap();

        let input = serde_json::json!({"working_directory": "pkg", "directory": "."});
        let result = dispatcher(temp.path()).dispatch(&call("get_files_info", input)).await;
        assert_eq!(result, ToolResult::success("- only-here.txt: file_size=1 bytes, is_dir=false"));

        let absolute = temp.path().join("pkg");
        let input = serde_json::json!({"working_directory": absolute.to_str().unwrap(), "file_path": "only-here.txt"});
        let result = dispatcher(temp.path()).dispatch(&call("get_file_content", input)).await;
        assert_eq!(result, ToolResult::success("x"));
    }

    #[tokio::test]
    async fn test_dispatch_refuses_working_directory_outside_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("project");
        fs::create_dir(&root).unwrap();
        fs::write(temp.path().join("secret.txt"), "top secret").unwrap();
        let d = dispatcher(&root);

        let input = serde_json::json!({"working_directory": "/etc", "file_path": "hostname"});
        let result = d.dispatch(&call("get_file_content", input)).await;
        assert_eq!(result.kind(), Some(FailureKind::OutsideRoot));
        assert_eq!(
            result.content(),
            "Cannot read \"/etc\" as it is outside the permitted working directory"
        );

        let input = serde_json::json!({"working_directory": "..", "file_path": "secret.txt", "content": "pwned"});
        let result = d.dispatch(&call("write_file", input)).await;
        assert_eq!(result.kind(), Some(FailureKind::OutsideRoot));
        assert_eq!(fs::read_to_string(temp.path().join("secret.txt")).unwrap(), "top secret");

        let input = Value::String(temp.path().to_str().unwrap().to_string());
        let result = d.dispatch(&call("get_files_info", input)).await;
        assert_eq!(result.kind(), Some(FailureKind::OutsideRoot));
    }

    #[tokio::test]
    async fn test_dispatch_positional_root() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "abc").unwrap();

        let input = Value::String(temp.path().to_str().unwrap().to_string());
        let result = dispatcher(temp.path()).dispatch(&call("get_files_info", input)).await;
        assert_eq!(result, ToolResult::success("- a.txt: file_size=3 bytes, is_dir=false"));

        let input = Value::String(temp.path().to_str().unwrap().to_string());
        let result = dispatcher(temp.path()).dispatch(&call("get_file_content", input)).await;
        assert_eq!(result.kind(), Some(FailureKind::InvalidArguments));
    }

    #[tokio::test]
    async fn test_dispatch_missing_required_argument() {
        let temp = tempdir().unwrap();
        let result = dispatcher(temp.path())
            .dispatch(&call("write_file", serde_json::json!({"file_path": "a.txt"})))
            .await;

        assert_eq!(result.kind(), Some(FailureKind::InvalidArguments));
        assert!(result.content().starts_with("Invalid arguments:"));
        assert!(result.content().contains("content"));
        assert!(!temp.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_dispatch_wrong_argument_shapes() {
        let temp = tempdir().unwrap();
        let d = dispatcher(temp.path());

        let cases = vec![
            call("get_file_content", serde_json::json!({"file_path": 42})),
            call("run_script_file", serde_json::json!({"file_path": "a.sh", "args": "not-a-list"})),
            call("get_files_info", serde_json::json!({"directory": ".", "recursive": true})),
            call("get_files_info", serde_json::json!({"working_directory": ["x"]})),
            call("get_files_info", Value::Null),
        ];

        for c in &cases {
            let result = d.dispatch(c).await;
            assert_eq!(result.kind(), Some(FailureKind::InvalidArguments), "input: {}", c.input);
        }
    }

    #[tokio::test]
    async fn test_dispatch_missing_root() {
        let temp = tempdir().unwrap();
        let d = dispatcher(&temp.path().join("not-created"));

        let result = d.dispatch(&call("get_files_info", serde_json::json!({}))).await;
        assert_eq!(result.kind(), Some(FailureKind::NotADirectory));

        let input = serde_json::json!({"file_path": "a.txt", "content": "x"});
        let result = d.dispatch(&call("write_file", input)).await;
        assert_eq!(result.kind(), Some(FailureKind::NotADirectory));
        assert!(!temp.path().join("not-created").exists());
    }

    #[tokio::test]
    async fn test_schemas_match_argument_validation() {
        let temp = tempdir().unwrap();
        let d = dispatcher(temp.path());

        for def in d.definitions() {
            let properties = def.input_schema["properties"].as_object().unwrap();
            let mut input = Map::new();
            for (key, schema) in properties {
                let value = match schema["type"].as_str().unwrap() {
                    "string" => serde_json::json!("x"),
                    "array" => serde_json::json!(["x"]),
                    other => panic!("unexpected schema type {other}"),
                };
                input.insert(key.clone(), value);
            }

            let result = d.dispatch(&call(&def.name, Value::Object(input))).await;
            assert_ne!(
                result.kind(),
                Some(FailureKind::InvalidArguments),
                "{} rejected its own schema: {}",
                def.name,
                result.content()
            );

            if let Some(required) = def.input_schema["required"].as_array() {
                for field in required {
                    let mut partial = properties.clone();
                    partial.remove(field.as_str().unwrap());
                    let partial: Map<String, Value> = partial
                        .into_iter()
                        .map(|(k, _)| (k, serde_json::json!("x")))
                        .filter(|(k, _)| k != "args")
                        .collect();
                    let result = d.dispatch(&call(&def.name, Value::Object(partial))).await;
                    assert_eq!(result.kind(), Some(FailureKind::InvalidArguments), "{} without {}", def.name, field);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_all_preserves_order() {
        let temp = tempdir().unwrap();
        let d = dispatcher(temp.path());

        let calls = vec![
            ToolCall {
                id: "first".to_string(),
                name: "write_file".to_string(),
                input: serde_json::json!({"file_path": "a.txt", "content": "abc"}),
            },
            ToolCall {
                id: "second".to_string(),
                name: "get_file_content".to_string(),
                input: serde_json::json!({"file_path": "a.txt"}),
            },
        ];

        let mut seen = Vec::new();
        let results = d.dispatch_all(&calls, |call| seen.push(call.id.clone())).await;
        assert_eq!(seen, vec!["first", "second"]);
        assert_eq!(results[0].0, "first");
        assert_eq!(results[1], ("second".to_string(), ToolResult::success("abc")));
    }

    #[tokio::test]
    async fn test_guarded_converts_panic() {
        let result = guarded(async {
            if true {
                panic!("tool exploded");
            }
            Ok::<_, ToolError>("unreachable".to_string())
        })
        .await;

        assert_eq!(result.kind(), Some(FailureKind::InternalError));
        assert_eq!(result.content(), "Function execution error: tool exploded");
    }
}
