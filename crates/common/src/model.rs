//! Client model IR
//!
//! The aggregate handed to a code emitter: base URL, security, operations
//! with fully resolved types, and every generated class grouped by module.

use crate::{AnnotatedType, Pointer, TypeName, Warning};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Complete model of one API client
#[derive(Debug, Clone, Serialize)]
pub struct ClientModel {
    /// API title (`info.title`)
    pub title: String,

    /// API version (`info.version`)
    pub version: String,

    /// Data needed to construct the client
    pub init: InitModel,

    /// Security schemes referenced anywhere, each materialized once
    pub security_schemes: Vec<SecuritySchemeModel>,

    /// Operations in document order
    pub operations: Vec<OperationModel>,

    /// Generated classes keyed by dotted module path
    pub modules: BTreeMap<String, Vec<SchemaClass>>,

    /// Non-fatal conditions met while building
    pub warnings: Vec<Warning>,
}

impl ClientModel {
    /// Look up a generated class by its name
    pub fn class(&self, name: &TypeName) -> Option<&SchemaClass> {
        self.modules
            .get(&name.module_path())
            .and_then(|classes| classes.iter().find(|c| c.name == *name))
    }

    pub fn operation(&self, operation_id: &str) -> Option<&OperationModel> {
        self.operations
            .iter()
            .find(|op| op.operation_id == operation_id)
    }

    pub fn class_count(&self) -> usize {
        self.modules.values().map(Vec::len).sum()
    }
}

/// Client construction data
#[derive(Debug, Clone, Default, Serialize)]
pub struct InitModel {
    /// First server URL with its variables substituted
    pub base_url: Option<String>,

    /// Headers sent with every request (`x-global-headers`)
    pub global_headers: Vec<ParameterModel>,

    /// Responses any operation may produce (`x-global-responses`)
    pub global_responses: Vec<ResponseModel>,

    /// Requirement applied to operations that declare none
    pub default_security: Option<SecurityRequirementModel>,
}

/// HTTP method of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// All methods in path-item declaration order
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    /// Key of this method inside a path item
    pub fn key(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key().to_uppercase())
    }
}

/// One API operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationModel {
    /// Function identifier derived from the operationId
    pub name: String,
    pub operation_id: String,
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub tags: Vec<String>,

    /// Signature parameters: path and query parameters, then the metadata
    /// aggregate (if any header or cookie parameter exists)
    pub parameters: Vec<ParameterModel>,
    pub request_body: Option<RequestBodyModel>,

    /// Every declared response, success and error alike
    pub responses: Vec<ResponseModel>,

    /// Union over success responses
    pub return_type: AnnotatedType,

    /// Effective requirement (operation level, else the global one)
    pub security: Option<SecurityRequirementModel>,
}

impl OperationModel {
    pub fn parameter(&self, wire_name: &str) -> Option<&ParameterModel> {
        self.parameters.iter().find(|p| p.wire_name == wire_name)
    }

    pub fn error_responses(&self) -> impl Iterator<Item = &ResponseModel> {
        self.responses.iter().filter(|r| r.status.is_error())
    }
}

/// Where a parameter travels on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    /// Synthetic aggregate of an operation's header and cookie parameters
    Metadata,
}

impl ParameterLocation {
    pub fn parse(location: &str) -> Option<Self> {
        match location {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }

    /// Header and cookie parameters are folded into the metadata aggregate
    pub fn is_metadata(self) -> bool {
        matches!(
            self,
            ParameterLocation::Header | ParameterLocation::Cookie | ParameterLocation::Metadata
        )
    }
}

/// Serialization style of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn parse(style: &str) -> Option<Self> {
        match style {
            "matrix" => Some(ParameterStyle::Matrix),
            "label" => Some(ParameterStyle::Label),
            "form" => Some(ParameterStyle::Form),
            "simple" => Some(ParameterStyle::Simple),
            "spaceDelimited" => Some(ParameterStyle::SpaceDelimited),
            "pipeDelimited" => Some(ParameterStyle::PipeDelimited),
            "deepObject" => Some(ParameterStyle::DeepObject),
            _ => None,
        }
    }

    /// Default style for a location
    pub fn default_for(location: ParameterLocation) -> Self {
        match location {
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
            ParameterLocation::Path
            | ParameterLocation::Header
            | ParameterLocation::Metadata => ParameterStyle::Simple,
        }
    }
}

/// A resolved parameter
#[derive(Debug, Clone, Serialize)]
pub struct ParameterModel {
    /// Identifier used in the generated signature
    pub name: String,

    /// Name on the wire
    pub wire_name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub deprecated: bool,
    pub description: Option<String>,
    pub annotation: AnnotatedType,
    pub style: ParameterStyle,
    pub explode: bool,

    /// Set when the parameter is described through `content`
    pub media_type: Option<String>,
    pub pointer: Pointer,
}

/// A resolved request body
#[derive(Debug, Clone, Serialize)]
pub struct RequestBodyModel {
    pub media_type: String,
    pub required: bool,
    pub description: Option<String>,
    pub annotation: AnnotatedType,
}

/// Status key of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResponseStatus {
    Code(u16),
    /// `2XX` style range, holding the leading digit
    Range(u8),
    Default,
}

impl ResponseStatus {
    pub fn parse(status: &str) -> Option<Self> {
        if status == "default" {
            return Some(ResponseStatus::Default);
        }
        let upper = status.to_ascii_uppercase();
        if let Some(lead) = upper.strip_suffix("XX") {
            return lead
                .parse::<u8>()
                .ok()
                .filter(|d| (1..=5).contains(d))
                .map(ResponseStatus::Range);
        }
        status
            .parse::<u16>()
            .ok()
            .filter(|code| (100..600).contains(code))
            .map(ResponseStatus::Code)
    }

    /// 4xx and 5xx statuses are raised by the runtime rather than returned
    pub fn is_error(self) -> bool {
        match self {
            ResponseStatus::Code(code) => code >= 400,
            ResponseStatus::Range(lead) => lead >= 4,
            ResponseStatus::Default => false,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Code(code) => write!(f, "{code}"),
            ResponseStatus::Range(lead) => write!(f, "{lead}XX"),
            ResponseStatus::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ResponseStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved response
#[derive(Debug, Clone, Serialize)]
pub struct ResponseModel {
    pub status: ResponseStatus,
    pub description: Option<String>,
    pub media_type: Option<String>,

    /// Body type, `Null` when the response has no content
    pub body: AnnotatedType,

    /// Aggregate of the response headers, if any were declared
    pub metadata: Option<AnnotatedType>,
}

/// Alternatives of scheme sets; any one set satisfies the requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityRequirementModel {
    /// Each alternative maps scheme names to required scopes. An empty
    /// alternative means anonymous access is allowed.
    pub alternatives: Vec<BTreeMap<String, Vec<String>>>,
}

impl SecurityRequirementModel {
    pub fn scheme_names(&self) -> impl Iterator<Item = &String> {
        self.alternatives.iter().flat_map(|alt| alt.keys())
    }
}

/// A resolved security scheme
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecuritySchemeModel {
    /// Key in `components.securitySchemes`
    pub name: String,
    pub description: Option<String>,
    pub kind: SecuritySchemeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SecuritySchemeKind {
    ApiKey {
        parameter: String,
        location: ParameterLocation,
    },
    Http {
        scheme: String,
        bearer_format: Option<String>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 { flows: Vec<OAuthFlowModel> },
    OpenIdConnect { url: String },
}

/// One OAuth2 flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OAuthFlowModel {
    /// `implicit`, `password`, `clientCredentials` or `authorizationCode`
    pub flow: String,
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    pub scopes: BTreeMap<String, String>,
}

/// Kind of a generated class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassBase {
    /// Class derived from a schema
    Model,
    /// Synthetic aggregate of header/cookie values
    Metadata,
}

/// A generated structured type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaClass {
    pub name: TypeName,
    pub base: ClassBase,

    /// Unknown keys are accepted on the wire
    pub allow_extra: bool,
    pub description: Option<String>,
    pub fields: Vec<Field>,

    /// Document location the class was derived from
    pub pointer: Pointer,
}

impl SchemaClass {
    pub fn field(&self, alias: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.alias == alias)
    }
}

/// A member of a generated class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Identifier of the member
    pub name: String,

    /// Wire name
    pub alias: String,
    pub annotation: AnnotatedType,
    pub required: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub description: Option<String>,
    pub default: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_status() {
        assert_eq!(ResponseStatus::parse("200"), Some(ResponseStatus::Code(200)));
        assert_eq!(ResponseStatus::parse("2XX"), Some(ResponseStatus::Range(2)));
        assert_eq!(ResponseStatus::parse("4xx"), Some(ResponseStatus::Range(4)));
        assert_eq!(ResponseStatus::parse("default"), Some(ResponseStatus::Default));
        assert_eq!(ResponseStatus::parse("9XX"), None);
        assert_eq!(ResponseStatus::parse("ok"), None);
    }

    #[test]
    fn test_error_statuses() {
        assert!(!ResponseStatus::Code(204).is_error());
        assert!(!ResponseStatus::Code(302).is_error());
        assert!(ResponseStatus::Code(404).is_error());
        assert!(ResponseStatus::Range(5).is_error());
        assert!(!ResponseStatus::Default.is_error());
    }

    #[test]
    fn test_default_styles() {
        assert_eq!(
            ParameterStyle::default_for(ParameterLocation::Query),
            ParameterStyle::Form
        );
        assert_eq!(
            ParameterStyle::default_for(ParameterLocation::Header),
            ParameterStyle::Simple
        );
        assert!(ParameterLocation::Cookie.is_metadata());
        assert!(!ParameterLocation::Query.is_metadata());
    }
}
