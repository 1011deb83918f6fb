//! Command-line access to resources served by an isoresource server.
//!
//! The CLI reads the resource manifests a server exports and drives a
//! [`RemoteProxy`](isoresource_client::RemoteProxy) with them, so a call made
//! here goes through the same validation, path substitution and envelope
//! handling as a call from client code.
//!
//! ```text
//! isoresource call --manifest tasks.json --base-url http://localhost:3000 show --field id=1
//! isoresource actions --manifest tasks.json
//! isoresource routes --manifest tasks.json --style braces
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use isoresource_client::{ClientConfig, RemoteClient, RemoteError};
use isoresource_core::{
    json_to_value, value_to_json, ParamStyle, PathPattern, PatternError, ResourceManifest, ResourceProxy, Value,
};
use isoresource_form::{arrange, FlatRecord, FormError, SchemaArranger};
use serde::Deserialize;

/// isoresource - call resources over HTTP
#[derive(Parser, Debug)]
#[command(name = "isoresource")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call one action and print its data as JSON
    Call {
        #[command(flatten)]
        target: Target,

        /// Server base URL (defaults to ISORESOURCE_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Extra request header, as "Name: value"
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Action name
        action: String,

        /// Input as a JSON object
        #[arg(long)]
        input: Option<String>,

        /// Input field as a form key, e.g. `user.name=Ada` or `tags[]=a`
        #[arg(long = "field", short = 'f')]
        fields: Vec<String>,
    },

    /// List the actions of a resource
    Actions {
        #[command(flatten)]
        target: Target,
    },

    /// Print every route in a host framework's path syntax
    Routes {
        /// Resource manifest file
        #[arg(long, short)]
        manifest: PathBuf,

        #[arg(long, value_enum, default_value_t = Style::Colon)]
        style: Style,
    },
}

/// Which resource of which manifest file.
#[derive(clap::Args, Debug)]
pub struct Target {
    /// Resource manifest file (one manifest or a list of them)
    #[arg(long, short)]
    pub manifest: PathBuf,

    /// Resource name; required when the file holds several manifests
    #[arg(long, short)]
    pub resource: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    /// `/tasks/:id`
    Colon,
    /// `/tasks/{id}`
    Braces,
}

impl From<Style> for ParamStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Colon => ParamStyle::Colon,
            Style::Braces => ParamStyle::Braces,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest file {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no resource named '{0}' in the manifest file")]
    UnknownResource(String),

    #[error("the manifest file describes no resources")]
    NoResources,

    #[error("the manifest file describes several resources ({0}); pick one with --resource")]
    AmbiguousResource(String),

    #[error("no base URL; pass --base-url or set {}", isoresource_client::BASE_URL_VAR)]
    MissingBaseUrl,

    #[error("header '{0}' is not in 'Name: value' form")]
    BadHeader(String),

    #[error("field '{0}' is not in 'key=value' form")]
    BadField(String),

    #[error("--input is not valid JSON: {0}")]
    Input(#[source] serde_json::Error),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl CliError {
    /// 2 for rejected input, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Remote(RemoteError::Validation(_)) | CliError::Form(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Many(Vec<ResourceManifest>),
    One(ResourceManifest),
}

/// Read one manifest or a list of them.
pub fn load_manifests(path: &Path) -> Result<Vec<ResourceManifest>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ManifestFile = serde_json::from_str(&text).map_err(|source| CliError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match file {
        ManifestFile::Many(manifests) => manifests,
        ManifestFile::One(manifest) => vec![manifest],
    })
}

fn select(manifests: Vec<ResourceManifest>, resource: Option<&str>) -> Result<ResourceManifest, CliError> {
    match resource {
        Some(name) => manifests
            .into_iter()
            .find(|manifest| manifest.name == name)
            .ok_or_else(|| CliError::UnknownResource(name.to_string())),
        None if manifests.is_empty() => Err(CliError::NoResources),
        None if manifests.len() == 1 => {
            let mut manifests = manifests;
            Ok(manifests.remove(0))
        }
        None => Err(CliError::AmbiguousResource(
            manifests
                .iter()
                .map(|manifest| manifest.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}

fn load_target(target: &Target) -> Result<ResourceManifest, CliError> {
    select(load_manifests(&target.manifest)?, target.resource.as_deref())
}

fn parse_header(header: &str) -> Result<(String, String), CliError> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| CliError::BadHeader(header.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::BadHeader(header.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Build call input from `--input` and `--field`; fields win on conflicts.
///
/// Fields are cast with the action's schema the same way a form post is, but
/// not validated here; the proxy does that.
pub fn build_input(
    manifest: &ResourceManifest,
    action: &str,
    input: Option<&str>,
    fields: &[String],
) -> Result<Option<Value>, CliError> {
    let mut value = match input {
        Some(json) => Some(json_to_value(serde_json::from_str(json).map_err(CliError::Input)?)),
        None => None,
    };

    if !fields.is_empty() {
        let mut record = FlatRecord::new();
        for field in fields {
            let (key, text) = field
                .split_once('=')
                .ok_or_else(|| CliError::BadField(field.clone()))?;
            record.insert(key, text);
        }
        let from_fields = match manifest.action(action) {
            Some(found) => arrange(&record, &SchemaArranger::new(&found.schema))?,
            None => arrange(&record, &isoresource_form::PassthroughArranger)?,
        };
        match value.as_mut() {
            Some(existing) => existing.merge(from_fields),
            None => value = Some(from_fields),
        }
    }
    Ok(value)
}

fn describe_actions(manifest: &ResourceManifest) -> Result<String, CliError> {
    let mount = PathPattern::parse(&manifest.path)?;
    let mut lines = Vec::new();
    for action in &manifest.actions {
        let descriptor = &action.descriptor;
        let pattern = mount.join(&PathPattern::parse(&descriptor.path)?);
        let methods: Vec<_> = descriptor.methods.iter().map(|method| method.as_str()).collect();
        let mut line = format!("{:<10} {:<12} {}", descriptor.action, methods.join(","), pattern);
        if action.schema.is_blank() {
            line.push_str("  (no input)");
        }
        if descriptor.page {
            line.push_str("  [page]");
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn describe_routes(manifests: &[ResourceManifest], style: ParamStyle) -> Result<String, CliError> {
    let mut lines = Vec::new();
    for manifest in manifests {
        let mount = PathPattern::parse(&manifest.path)?;
        for action in &manifest.actions {
            let path = mount
                .join(&PathPattern::parse(&action.descriptor.path)?)
                .to_framework(style);
            for method in &action.descriptor.methods {
                lines.push(format!("{} {}", method.as_str(), path));
            }
        }
    }
    Ok(lines.join("\n"))
}

/// Execute a parsed command and return what should be printed.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    match cli.command {
        Command::Call {
            target,
            base_url,
            headers,
            timeout,
            action,
            input,
            fields,
        } => {
            let manifest = load_target(&target)?;
            let mut config = match base_url {
                Some(url) => ClientConfig::new(&url)?,
                None => ClientConfig::from_env().ok_or(CliError::MissingBaseUrl)??,
            };
            config = config.with_timeout(Duration::from_secs(timeout));
            for header in &headers {
                let (name, value) = parse_header(header)?;
                config = config.with_header(name, value);
            }

            let input = build_input(&manifest, &action, input.as_deref(), &fields)?;
            tracing::info!(resource = %manifest.name, action = %action, "calling");
            let proxy = RemoteClient::new(config)?.proxy(&manifest)?;
            let output = proxy.call(&action, input).await?;
            if output.is_undefined() {
                return Ok(String::new());
            }
            Ok(format!("{:#}", value_to_json(output)))
        }
        Command::Actions { target } => describe_actions(&load_target(&target)?),
        Command::Routes { manifest, style } => describe_routes(&load_manifests(&manifest)?, style.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoresource_core::{ActionDescriptor, ManifestAction, Method, Schema};
    use rstest::rstest;

    fn tasks() -> ResourceManifest {
        ResourceManifest {
            name: "tasks".to_string(),
            path: "/tasks".to_string(),
            actions: vec![
                ManifestAction {
                    descriptor: ActionDescriptor::new("create", "/", Method::POST),
                    schema: Schema::object([
                        ("title", Schema::string()),
                        ("points", Schema::integer().optional()),
                        ("tags", Schema::array(Schema::string()).optional()),
                    ]),
                },
                ManifestAction {
                    descriptor: ActionDescriptor::new("stats", "/stats", Method::GET),
                    schema: Schema::blank(),
                },
            ],
        }
    }

    #[test]
    fn parses_call_arguments() {
        let cli = Cli::try_parse_from([
            "isoresource",
            "call",
            "--manifest",
            "tasks.json",
            "-H",
            "Authorization: Bearer t",
            "create",
            "-f",
            "title=ship",
        ])
        .unwrap();
        match cli.command {
            Command::Call {
                target,
                headers,
                action,
                fields,
                timeout,
                ..
            } => {
                assert_eq!(target.manifest, PathBuf::from("tasks.json"));
                assert_eq!(headers, vec!["Authorization: Bearer t"]);
                assert_eq!(action, "create");
                assert_eq!(fields, vec!["title=ship"]);
                assert_eq!(timeout, 30);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn fields_are_cast_with_the_schema() {
        let fields = vec!["title=ship".to_string(), "points=3".to_string(), "tags[]=a".to_string()];
        let input = build_input(&tasks(), "create", None, &fields).unwrap().unwrap();
        assert_eq!(input.get("points"), Some(&Value::Integer(3)));
        assert_eq!(input.get("tags"), Some(&Value::from(vec!["a"])));
    }

    #[test]
    fn fields_override_json_input() {
        let fields = vec!["title=override".to_string()];
        let input = build_input(&tasks(), "create", Some(r#"{"title":"json","points":1}"#), &fields)
            .unwrap()
            .unwrap();
        assert_eq!(input.get("title"), Some(&Value::from("override")));
        assert_eq!(input.get("points"), Some(&Value::Integer(1)));
    }

    #[rstest]
    #[case("no-equals")]
    #[case("")]
    fn rejects_malformed_fields(#[case] field: &str) {
        let error = build_input(&tasks(), "create", None, &[field.to_string()]).unwrap_err();
        assert!(matches!(error, CliError::BadField(_)));
    }

    #[rstest]
    #[case("Accept: text/html", Some(("Accept", "text/html")))]
    #[case("X-Token:abc", Some(("X-Token", "abc")))]
    #[case("missing colon", None)]
    #[case(": empty name", None)]
    fn header_syntax(#[case] header: &str, #[case] expected: Option<(&str, &str)>) {
        let parsed = parse_header(header).ok();
        assert_eq!(
            parsed.as_ref().map(|(n, v)| (n.as_str(), v.as_str())),
            expected
        );
    }

    #[test]
    fn resource_selection() {
        let mut other = tasks();
        other.name = "users".to_string();
        assert!(matches!(
            select(vec![tasks(), other.clone()], None),
            Err(CliError::AmbiguousResource(ref names)) if names == "tasks, users"
        ));
        assert_eq!(select(vec![tasks(), other], Some("users")).unwrap().name, "users");
        assert_eq!(select(vec![tasks()], None).unwrap().name, "tasks");
        assert!(matches!(select(vec![tasks()], Some("x")), Err(CliError::UnknownResource(_))));
        assert!(matches!(select(Vec::new(), None), Err(CliError::NoResources)));
    }

    #[test]
    fn lists_actions_and_routes() {
        let actions = describe_actions(&tasks()).unwrap();
        assert!(actions.lines().any(|line| line.starts_with("stats") && line.ends_with("(no input)")));
        let routes = describe_routes(&[tasks()], ParamStyle::Colon).unwrap();
        assert_eq!(routes, "POST /tasks\nGET /tasks/stats");
    }

    #[test]
    fn validation_failures_exit_with_two() {
        let error = CliError::Remote(RemoteError::Validation(isoresource_core::ValidationError::custom(
            vec!["title".into()],
            "Required",
        )));
        assert_eq!(error.exit_code(), 2);
        assert_eq!(CliError::MissingBaseUrl.exit_code(), 1);
    }
}
