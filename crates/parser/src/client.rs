//! Client/operation model builder
//!
//! Walks servers, paths, operations, parameters, bodies, responses and
//! security requirements in document order and assembles a [`ClientModel`].
//! Every schema position goes through the [`SchemaContext`], which also
//! collects the classes the model needs.

use crate::naming::{EscapingIdentifiers, IdentifierStrategy};
use crate::openapi::{
    parse_at, Header, MediaType, OAuthFlow, OAuthFlows, OpenApiSpec, Operation, Parameter,
    PathItem, ReferenceOr, RequestBody, Resolver, Response, SecurityRequirement, SecurityScheme,
    Server,
};
use crate::schema::{derived_name, SchemaContext};
use clientgen_common::naming::to_pascal_case;
use clientgen_common::{
    AnnotatedType, BuilderConfig, ClassBase, ClientModel, Field, GeneratorError, HttpMethod,
    InitModel, OAuthFlowModel, OperationModel, ParameterLocation, ParameterModel, ParameterStyle,
    Pointer, RequestBodyModel, ResponseModel, ResponseStatus, Result, SchemaClass,
    SecurityRequirementModel, SecuritySchemeKind, SecuritySchemeModel, TypeName, Warning,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Builds a [`ClientModel`] from a parsed document
pub struct ClientBuilder<'a> {
    document: &'a Value,
    config: BuilderConfig,
    naming: Option<Box<dyn IdentifierStrategy + 'a>>,
}

impl<'a> ClientBuilder<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            config: BuilderConfig::default(),
            naming: None,
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default [`EscapingIdentifiers`]
    pub fn with_naming(mut self, naming: Box<dyn IdentifierStrategy + 'a>) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Run the build; any error aborts it without a partial model
    pub fn build(self) -> Result<ClientModel> {
        let root = Pointer::root();
        let spec: OpenApiSpec = parse_at(self.document, &root)?;
        if !spec.openapi.starts_with("3.") {
            return Err(GeneratorError::unsupported(
                &root.push("openapi"),
                format!("only OpenAPI 3.x documents are supported, found {}", spec.openapi),
            ));
        }

        let naming = self
            .naming
            .unwrap_or_else(|| Box::new(EscapingIdentifiers::new(&self.config.extra_keywords)));
        let mut state = BuildState {
            config: &self.config,
            schemas: SchemaContext::new(Resolver::new(self.document), naming),
            schemes: IndexMap::new(),
            operation_ids: HashSet::new(),
            default_security: None,
        };

        let init = state.init(&spec)?;

        let mut operations = Vec::new();
        for (path, item) in &spec.paths {
            let declared: Vec<(HttpMethod, &Operation)> = HttpMethod::ALL
                .into_iter()
                .filter_map(|method| item.operation(method.key()).map(|op| (method, op)))
                .collect();
            if declared.is_empty() {
                continue;
            }

            let shared = state.path_parameters(path, item)?;
            for (method, operation) in declared {
                operations.push(state.operation(path, &shared, method, operation)?);
            }
        }

        if self.config.include_component_schemas {
            if let Some(components) = &spec.components {
                let base = root.push("components").push("schemas");
                for name in components.schemas.keys() {
                    let pointer = base.push(name.as_str());
                    if state.schemas.annotate(&pointer, true)?.is_none() {
                        state.schemas.warn(Warning::BottomSchema { pointer });
                    }
                }
            }
        }

        let mut modules: BTreeMap<String, Vec<SchemaClass>> = BTreeMap::new();
        for (name, class) in state.schemas.take_classes() {
            modules.entry(name.module_path()).or_default().push(class);
        }

        let model = ClientModel {
            title: spec.info.title.clone(),
            version: spec.info.version.clone(),
            init,
            security_schemes: state.schemes.into_values().collect(),
            operations,
            modules,
            warnings: state.schemas.take_warnings(),
        };

        tracing::info!(
            "Built client model for {} {}: {} operations, {} classes, {} warnings",
            model.title,
            model.version,
            model.operations.len(),
            model.class_count(),
            model.warnings.len()
        );
        Ok(model)
    }
}

struct BuildState<'a, 'c> {
    config: &'c BuilderConfig,
    schemas: SchemaContext<'a>,
    /// Resolved schemes by name, in order of first use
    schemes: IndexMap<String, SecuritySchemeModel>,
    operation_ids: HashSet<String>,
    default_security: Option<SecurityRequirementModel>,
}

impl BuildState<'_, '_> {
    fn init(&mut self, spec: &OpenApiSpec) -> Result<InitModel> {
        let root = Pointer::root();

        let global_headers_at = root.push("x-global-headers");
        let mut global_headers = Vec::new();
        for (i, header) in spec.global_headers.iter().enumerate() {
            if let Some(param) = self.parameter(header, &global_headers_at.index(i), "Global")? {
                global_headers.push(param);
            }
        }

        let global_responses_at = root.push("x-global-responses");
        let mut global_responses = Vec::new();
        for (status, response) in &spec.global_responses {
            let at = global_responses_at.push(status.as_str());
            global_responses.push(self.response(status, response, &at, "Global")?);
        }

        let default_security = match &spec.security {
            Some(requirements) => Some(self.security_requirement(requirements)?),
            None => None,
        };
        self.default_security = default_security.clone();

        Ok(InitModel {
            base_url: self.base_url(&spec.servers),
            global_headers,
            global_responses,
            default_security,
        })
    }

    /// First server, with its variables replaced by their defaults
    fn base_url(&mut self, servers: &[Server]) -> Option<String> {
        let server = servers.first()?;
        let mut url = server.url.clone();
        for (name, variable) in &server.variables {
            url = url.replace(&format!("{{{}}}", name), &variable.default);
        }

        if servers.len() > 1 {
            self.schemas.warn(Warning::MultipleServers {
                count: servers.len(),
                used: url.clone(),
            });
        }
        Some(url)
    }

    /// Path-level parameters, resolved once and shared by every operation
    /// of the path
    fn path_parameters(&mut self, path: &str, item: &PathItem) -> Result<Vec<ParameterModel>> {
        let at = Pointer::root().push("paths").push(path).push("parameters");
        let owner = self
            .schemas
            .naming()
            .class_name(&derived_name(&[path.to_string()]));

        let mut parameters = Vec::with_capacity(item.parameters.len());
        for (i, param) in item.parameters.iter().enumerate() {
            if let Some(param) = self.parameter(param, &at.index(i), &owner)? {
                parameters.push(param);
            }
        }
        Ok(parameters)
    }

    fn operation(
        &mut self,
        path: &str,
        shared: &[ParameterModel],
        method: HttpMethod,
        operation: &Operation,
    ) -> Result<OperationModel> {
        let at = Pointer::root().push("paths").push(path).push(method.key());

        let operation_id =
            operation
                .operation_id
                .clone()
                .ok_or_else(|| GeneratorError::MissingOperationId {
                    method: method.to_string(),
                    path: path.to_string(),
                })?;
        if !self.operation_ids.insert(operation_id.clone()) {
            return Err(GeneratorError::unsupported(
                &at,
                format!("duplicate operationId '{}'", operation_id),
            ));
        }
        tracing::debug!("Building operation {} ({} {})", operation_id, method, path);

        let name = self.schemas.naming().operation_name(&operation_id);
        let class_base = self.schemas.naming().class_name(&operation_id);

        // an operation-level parameter replaces the path-level one with the
        // same name and location
        let mut merged: IndexMap<(ParameterLocation, String), ParameterModel> = shared
            .iter()
            .map(|param| ((param.location, param.wire_name.clone()), param.clone()))
            .collect();
        let base = at.push("parameters");
        for (i, param) in operation.parameters.iter().enumerate() {
            if let Some(param) = self.parameter(param, &base.index(i), &class_base)? {
                merged.insert((param.location, param.wire_name.clone()), param);
            }
        }

        let (metadata, mut parameters): (Vec<_>, Vec<_>) = merged
            .into_values()
            .partition(|param| param.location.is_metadata());

        let mut taken = HashSet::new();
        for param in &mut parameters {
            param.name = unique_name(&param.name, &mut taken);
        }
        if !metadata.is_empty() {
            let name = unique_name(&self.schemas.naming().field_name("metadata"), &mut taken);
            parameters.push(self.metadata_parameter(&at, &class_base, name, metadata));
        }

        let request_body = match &operation.request_body {
            Some(body) => self.request_body(body, &at.push("requestBody"), &class_base)?,
            None => None,
        };

        let responses_at = at.push("responses");
        let mut responses = Vec::with_capacity(operation.responses.len());
        for (status, response) in &operation.responses {
            let response_at = responses_at.push(status.as_str());
            responses.push(self.response(status, response, &response_at, &class_base)?);
        }
        let return_type = return_type(&responses);

        let security = match &operation.security {
            Some(requirements) => Some(self.security_requirement(requirements)?),
            None => self.default_security.clone(),
        };

        Ok(OperationModel {
            name,
            operation_id,
            method,
            path: path.to_string(),
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            deprecated: operation.deprecated,
            tags: operation.tags.clone(),
            parameters,
            request_body,
            responses,
            return_type,
            security,
        })
    }

    /// Resolve one parameter; ignored headers yield `None`
    fn parameter(
        &mut self,
        param: &ReferenceOr<Parameter>,
        at: &Pointer,
        owner: &str,
    ) -> Result<Option<ParameterModel>> {
        let resolver = self.schemas.resolver();
        let (at, param) = resolver.resolve_item(param, at)?;

        let location = ParameterLocation::parse(&param.location).ok_or_else(|| {
            GeneratorError::unsupported(
                &at,
                format!("unknown parameter location '{}'", param.location),
            )
        })?;
        if location == ParameterLocation::Header && self.config.is_ignored_header(&param.name) {
            self.schemas.warn(Warning::IgnoredHeader {
                pointer: at,
                name: param.name.clone(),
            });
            return Ok(None);
        }

        let required = param.required || location == ParameterLocation::Path;
        let (annotation, media_type) = self.payload(
            &at,
            param.schema.is_some(),
            param.content.as_ref(),
            required,
            &format!("{}{}", owner, to_pascal_case(&param.name)),
        )?;

        let style = match param.style.as_deref() {
            Some(style) => ParameterStyle::parse(style).ok_or_else(|| {
                GeneratorError::unsupported(&at, format!("unknown parameter style '{}'", style))
            })?,
            None => ParameterStyle::default_for(location),
        };
        let explode = param.explode.unwrap_or(style == ParameterStyle::Form);
        let effective = param.name_hint.as_deref().unwrap_or(&param.name);

        Ok(Some(ParameterModel {
            name: self.schemas.naming().field_name(effective),
            wire_name: param.name.clone(),
            location,
            required,
            deprecated: param.deprecated,
            description: param.description.clone(),
            annotation,
            style,
            explode,
            media_type,
            pointer: at,
        }))
    }

    /// Type of a parameter or header: `schema` XOR single-entry `content`
    fn payload(
        &mut self,
        at: &Pointer,
        has_schema: bool,
        content: Option<&IndexMap<String, MediaType>>,
        required: bool,
        class_hint: &str,
    ) -> Result<(AnnotatedType, Option<String>)> {
        match (has_schema, content) {
            (true, Some(_)) => Err(GeneratorError::unsupported(
                at,
                "both `schema` and `content` are declared",
            )),
            (true, None) => {
                let annotation = self.schema_annotation(&at.push("schema"), required, class_hint)?;
                Ok((annotation, None))
            }
            (false, Some(content)) if content.len() > 1 => Err(GeneratorError::unsupported(
                at,
                "`content` must declare exactly one media type",
            )),
            (false, Some(content)) => match content.first() {
                Some((media, media_type)) if media_type.schema.is_some() => {
                    let pointer = at.push("content").push(media.as_str()).push("schema");
                    let annotation = self.schema_annotation(&pointer, required, class_hint)?;
                    Ok((annotation, Some(media.clone())))
                }
                Some((media, _)) => Ok((AnnotatedType::Any, Some(media.clone()))),
                None => Ok((AnnotatedType::Any, None)),
            },
            (false, None) => Ok((AnnotatedType::Any, None)),
        }
    }

    /// Annotate the schema at `pointer`; a schema that never matches is
    /// reported and typed as `null`
    fn schema_annotation(
        &mut self,
        pointer: &Pointer,
        required: bool,
        class_hint: &str,
    ) -> Result<AnnotatedType> {
        self.schemas.suggest_class_name(pointer, class_hint);
        match self.schemas.annotate(pointer, required)? {
            Some(annotation) => Ok(annotation),
            None => {
                self.schemas.warn(Warning::BottomSchema {
                    pointer: pointer.clone(),
                });
                Ok(AnnotatedType::Null)
            }
        }
    }

    /// Fold header and cookie parameters into one synthetic class
    fn metadata_parameter(
        &mut self,
        at: &Pointer,
        class_base: &str,
        name: String,
        metadata: Vec<ParameterModel>,
    ) -> ParameterModel {
        let required = metadata.iter().any(|param| param.required);
        let mut taken = HashSet::new();
        let fields = metadata
            .into_iter()
            .map(|param| Field {
                name: unique_name(&param.name, &mut taken),
                alias: param.wire_name,
                annotation: param.annotation,
                required: param.required,
                read_only: false,
                write_only: false,
                description: param.description,
                default: None,
            })
            .collect();

        let class = self.synthetic_class(at, &format!("{}Metadata", class_base), fields, false);
        let annotation = AnnotatedType::named(class);

        ParameterModel {
            name,
            wire_name: "metadata".to_string(),
            location: ParameterLocation::Metadata,
            required,
            deprecated: false,
            description: None,
            annotation: if required {
                annotation
            } else {
                AnnotatedType::optional(annotation)
            },
            style: ParameterStyle::default_for(ParameterLocation::Metadata),
            explode: false,
            media_type: None,
            pointer: at.push("parameters"),
        }
    }

    fn synthetic_class(
        &mut self,
        at: &Pointer,
        base: &str,
        fields: Vec<Field>,
        allow_extra: bool,
    ) -> TypeName {
        let module: Vec<String> = at.segments().iter().take(1).cloned().collect();
        let name = self.schemas.allocate_name(&module, base);
        self.schemas.register_class(SchemaClass {
            name: name.clone(),
            base: ClassBase::Metadata,
            allow_extra,
            description: None,
            fields,
            pointer: at.clone(),
        });
        name
    }

    fn request_body(
        &mut self,
        body: &ReferenceOr<RequestBody>,
        at: &Pointer,
        class_base: &str,
    ) -> Result<Option<RequestBodyModel>> {
        let resolver = self.schemas.resolver();
        let (at, body) = resolver.resolve_item(body, at)?;
        let Some((media, media_type)) = self.pick_media(&body.content) else {
            return Ok(None);
        };

        let annotation = match &media_type.schema {
            Some(_) => {
                let pointer = at.push("content").push(media.as_str()).push("schema");
                let hint = format!("{}Request", class_base);
                self.schema_annotation(&pointer, body.required, &hint)?
            }
            None => AnnotatedType::Any,
        };

        Ok(Some(RequestBodyModel {
            media_type: media.clone(),
            required: body.required,
            description: body.description.clone(),
            annotation,
        }))
    }

    fn response(
        &mut self,
        status: &str,
        response: &ReferenceOr<Response>,
        at: &Pointer,
        class_base: &str,
    ) -> Result<ResponseModel> {
        let parsed = ResponseStatus::parse(status).ok_or_else(|| {
            GeneratorError::unsupported(at, format!("invalid response status '{}'", status))
        })?;
        let resolver = self.schemas.resolver();
        let (at, response) = resolver.resolve_item(response, at)?;
        let stem = format!("{}{}", class_base, to_pascal_case(status));

        let (body, media_type) = match self.pick_media(&response.content) {
            None => (AnnotatedType::Null, None),
            Some((media, media_type)) => {
                let body = match &media_type.schema {
                    Some(_) => {
                        let pointer = at.push("content").push(media.as_str()).push("schema");
                        self.schema_annotation(&pointer, true, &format!("{}Response", stem))?
                    }
                    None => AnnotatedType::Any,
                };
                (body, Some(media.clone()))
            }
        };

        let metadata = self.response_headers(&response.headers, &at, &stem)?;

        Ok(ResponseModel {
            status: parsed,
            description: response.description.clone(),
            media_type,
            body,
            metadata,
        })
    }

    /// Aggregate of a response's headers as a synthetic class
    fn response_headers(
        &mut self,
        headers: &IndexMap<String, ReferenceOr<Header>>,
        at: &Pointer,
        stem: &str,
    ) -> Result<Option<AnnotatedType>> {
        let headers_at = at.push("headers");
        let mut fields = Vec::new();
        for (wire, header) in headers {
            let header_at = headers_at.push(wire.as_str());
            if self.config.is_ignored_header(wire) {
                self.schemas.warn(Warning::IgnoredHeader {
                    pointer: header_at,
                    name: wire.clone(),
                });
                continue;
            }

            let resolver = self.schemas.resolver();
            let (header_at, header) = resolver.resolve_item(header, &header_at)?;
            let (annotation, _) = self.payload(
                &header_at,
                header.schema.is_some(),
                header.content.as_ref(),
                header.required,
                &format!("{}{}", stem, to_pascal_case(wire)),
            )?;
            let effective = header.name_hint.as_deref().unwrap_or(wire);

            fields.push(Field {
                name: self.schemas.naming().field_name(effective),
                alias: wire.clone(),
                annotation,
                required: header.required,
                read_only: false,
                write_only: false,
                description: header.description.clone(),
                default: None,
            });
        }

        if fields.is_empty() {
            return Ok(None);
        }
        let name = self.synthetic_class(at, &format!("{}ResponseMetadata", stem), fields, true);
        Ok(Some(AnnotatedType::named(name)))
    }

    /// Configured preference first, then the first declared media type
    fn pick_media<'m>(
        &self,
        content: &'m IndexMap<String, MediaType>,
    ) -> Option<(&'m String, &'m MediaType)> {
        let essence = |media: &str| {
            media
                .split(';')
                .next()
                .unwrap_or(media)
                .trim()
                .to_ascii_lowercase()
        };

        self.config
            .preferred_media_types
            .iter()
            .find_map(|preferred| {
                let preferred = essence(preferred.as_str());
                content
                    .iter()
                    .find(|(media, _)| essence(media.as_str()) == preferred)
            })
            .or_else(|| content.first())
    }

    fn security_requirement(
        &mut self,
        requirements: &[SecurityRequirement],
    ) -> Result<SecurityRequirementModel> {
        let mut alternatives = Vec::with_capacity(requirements.len());
        for requirement in requirements {
            let mut alternative = BTreeMap::new();
            for (scheme, scopes) in requirement {
                self.security_scheme(scheme)?;
                alternative.insert(scheme.clone(), scopes.clone());
            }
            alternatives.push(alternative);
        }
        Ok(SecurityRequirementModel { alternatives })
    }

    /// Resolve a scheme by name, once
    fn security_scheme(&mut self, name: &str) -> Result<()> {
        if self.schemes.contains_key(name) {
            return Ok(());
        }

        let at = Pointer::root()
            .push("components")
            .push("securitySchemes")
            .push(name);
        let (at, scheme): (Pointer, SecurityScheme) = self.schemas.resolver().resolve_as(&at)?;
        let missing = |field: &str| {
            GeneratorError::unsupported(
                &at,
                format!("{} security scheme without `{}`", scheme.scheme_type, field),
            )
        };

        let kind = match scheme.scheme_type.as_str() {
            "apiKey" => SecuritySchemeKind::ApiKey {
                parameter: scheme.name.clone().ok_or_else(|| missing("name"))?,
                location: scheme
                    .location
                    .as_deref()
                    .and_then(ParameterLocation::parse)
                    .filter(|location| {
                        location.is_metadata() || *location == ParameterLocation::Query
                    })
                    .ok_or_else(|| missing("in"))?,
            },
            "http" => SecuritySchemeKind::Http {
                scheme: scheme
                    .scheme
                    .as_deref()
                    .map(str::to_ascii_lowercase)
                    .ok_or_else(|| missing("scheme"))?,
                bearer_format: scheme.bearer_format.clone(),
            },
            "oauth2" => SecuritySchemeKind::OAuth2 {
                flows: oauth_flows(scheme.flows.as_ref()),
            },
            "openIdConnect" => SecuritySchemeKind::OpenIdConnect {
                url: scheme
                    .open_id_connect_url
                    .clone()
                    .ok_or_else(|| missing("openIdConnectUrl"))?,
            },
            other => {
                return Err(GeneratorError::unsupported(
                    &at,
                    format!("unknown security scheme type '{}'", other),
                ))
            }
        };

        self.schemes.insert(
            name.to_string(),
            SecuritySchemeModel {
                name: name.to_string(),
                description: scheme.description.clone(),
                kind,
            },
        );
        Ok(())
    }
}

fn oauth_flows(flows: Option<&OAuthFlows>) -> Vec<OAuthFlowModel> {
    let Some(flows) = flows else {
        return Vec::new();
    };
    let declared: [(&str, &Option<OAuthFlow>); 4] = [
        ("implicit", &flows.implicit),
        ("password", &flows.password),
        ("clientCredentials", &flows.client_credentials),
        ("authorizationCode", &flows.authorization_code),
    ];

    declared
        .into_iter()
        .filter_map(|(name, flow)| {
            flow.as_ref().map(|flow| OAuthFlowModel {
                flow: name.to_string(),
                authorization_url: flow.authorization_url.clone(),
                token_url: flow.token_url.clone(),
                refresh_url: flow.refresh_url.clone(),
                scopes: flow
                    .scopes
                    .iter()
                    .map(|(scope, description)| (scope.clone(), description.clone()))
                    .collect(),
            })
        })
        .collect()
}

/// `name`, or `name_2`, `name_3`... when it is already taken
fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut counter = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}_{}", name, counter);
        counter += 1;
    }
    candidate
}

/// Union over success responses; `(body, metadata)` tuples as soon as one
/// success response declares headers
fn return_type(responses: &[ResponseModel]) -> AnnotatedType {
    let success: Vec<&ResponseModel> = responses
        .iter()
        .filter(|response| !response.status.is_error())
        .collect();
    let with_headers = success.iter().any(|response| response.metadata.is_some());

    AnnotatedType::union(success.into_iter().map(|response| {
        if with_headers {
            AnnotatedType::Tuple {
                members: vec![
                    response.body.clone(),
                    response.metadata.clone().unwrap_or(AnnotatedType::Null),
                ],
            }
        } else {
            response.body.clone()
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::MockIdentifierStrategy;
    use clientgen_common::ScalarKind;
    use serde_json::json;

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "parameters": [{"name": "limit", "in": "query", "schema": {"type": "integer"}}],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }
        })
    }

    #[test]
    fn test_identifiers_come_from_the_strategy() {
        let mut naming = MockIdentifierStrategy::new();
        naming
            .expect_operation_name()
            .returning(|id| format!("op_{}", id));
        naming
            .expect_field_name()
            .returning(|name| format!("f_{}", name));
        naming
            .expect_class_name()
            .returning(|name| format!("C{}", name));
        naming
            .expect_module_name()
            .returning(|segment| segment.to_string());

        let doc = petstore();
        let model = ClientBuilder::new(&doc)
            .with_naming(Box::new(naming))
            .build()
            .unwrap();

        let operation = model.operation("listPets").unwrap();
        assert_eq!(operation.name, "op_listPets");
        assert_eq!(operation.parameter("limit").unwrap().name, "f_limit");
    }

    fn operations(paths: Value) -> ClientModel {
        let doc = json!({
            "openapi": "3.0.3",
            "info": {"title": "Test", "version": "1"},
            "paths": paths
        });
        ClientBuilder::new(&doc).build().unwrap()
    }

    fn signature(operation: &OperationModel) -> Vec<(String, ParameterLocation)> {
        operation
            .parameters
            .iter()
            .map(|param| (param.name.clone(), param.location))
            .collect()
    }

    #[test]
    fn test_metadata_parameter_avoids_direct_names() {
        let model = operations(json!({
            "/trace": {"get": {
                "operationId": "trace",
                "parameters": [
                    {"name": "metadata", "in": "query", "schema": {"type": "string"}},
                    {"name": "X-Trace", "in": "header", "schema": {"type": "string"}}
                ],
                "responses": {"204": {"description": "done"}}
            }}
        }));

        let operation = model.operation("trace").unwrap();
        assert_eq!(
            signature(operation),
            vec![
                ("metadata".to_string(), ParameterLocation::Query),
                ("metadata_2".to_string(), ParameterLocation::Metadata),
            ]
        );
    }

    #[test]
    fn test_parameters_merge_by_name_and_location() {
        let model = operations(json!({
            "/x/{id}": {
                "parameters": [
                    {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}},
                    {"name": "limit", "in": "query", "schema": {"type": "integer"}}
                ],
                "get": {
                    "operationId": "getX",
                    "parameters": [
                        {"name": "id", "in": "header", "schema": {"type": "string"}},
                        {"name": "id", "in": "query", "schema": {"type": "integer"}},
                        {"name": "limit", "in": "query", "schema": {"type": "string"}}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }));

        let operation = model.operation("getX").unwrap();
        assert_eq!(
            signature(operation),
            vec![
                ("id".to_string(), ParameterLocation::Path),
                ("limit".to_string(), ParameterLocation::Query),
                ("id_2".to_string(), ParameterLocation::Query),
                ("metadata".to_string(), ParameterLocation::Metadata),
            ]
        );

        let path_id = &operation.parameters[0];
        assert!(path_id.required);
        assert_eq!(path_id.annotation, AnnotatedType::scalar(ScalarKind::String));
        assert_eq!(
            operation.parameters[1].annotation,
            AnnotatedType::optional(AnnotatedType::scalar(ScalarKind::String))
        );

        let metadata = model
            .modules
            .values()
            .flatten()
            .find(|class| class.name.name == "GetXMetadata")
            .unwrap();
        assert_eq!(metadata.fields.len(), 1);
        assert_eq!(metadata.fields[0].alias, "id");
    }

    #[test]
    fn test_path_level_parameters_are_resolved_once() {
        let filter = json!({
            "name": "filter",
            "in": "query",
            "schema": {"type": "object", "properties": {"q": {"type": "string"}}}
        });
        let model = operations(json!({
            "/pets/{petId}": {
                "parameters": [filter],
                "get": {"operationId": "showPet", "responses": {"200": {"description": "ok"}}},
                "delete": {"operationId": "deletePet", "responses": {"204": {"description": "gone"}}}
            }
        }));

        let expected = AnnotatedType::optional(AnnotatedType::named(TypeName::new(
            vec!["paths".to_string()],
            "PetsPetIdFilter",
        )));
        for id in ["showPet", "deletePet"] {
            let operation = model.operation(id).unwrap();
            assert_eq!(operation.parameter("filter").unwrap().annotation, expected);
        }

        let filters = model
            .modules
            .values()
            .flatten()
            .filter(|class| class.name.name.starts_with("PetsPetIdFilter"))
            .count();
        assert_eq!(filters, 1);
    }

    #[test]
    fn test_return_type_ignores_error_responses() {
        let ok = ResponseModel {
            status: ResponseStatus::Code(200),
            description: None,
            media_type: None,
            body: AnnotatedType::scalar(ScalarKind::String),
            metadata: None,
        };
        let error = ResponseModel {
            status: ResponseStatus::Range(4),
            body: AnnotatedType::AnyObject,
            ..ok.clone()
        };
        assert_eq!(return_type(&[ok.clone(), error.clone()]), ok.body);
        assert_eq!(return_type(&[error]), AnnotatedType::Null);
    }

    #[test]
    fn test_return_type_pairs_bodies_with_headers() {
        let metadata = AnnotatedType::named(TypeName::new(vec![], "GetResponseMetadata"));
        let with_headers = ResponseModel {
            status: ResponseStatus::Code(200),
            description: None,
            media_type: None,
            body: AnnotatedType::AnyObject,
            metadata: Some(metadata.clone()),
        };
        let plain = ResponseModel {
            status: ResponseStatus::Code(204),
            body: AnnotatedType::Null,
            metadata: None,
            ..with_headers.clone()
        };

        let AnnotatedType::Union { members } = return_type(&[with_headers, plain]) else {
            panic!("expected a union of tuples");
        };
        assert_eq!(members.len(), 2);
        assert!(members.contains(&AnnotatedType::Tuple {
            members: vec![AnnotatedType::AnyObject, metadata],
        }));
    }

    #[test]
    fn test_pick_media_prefers_configuration() {
        let doc = json!({});
        let config = BuilderConfig::default();
        let state = BuildState {
            config: &config,
            schemas: SchemaContext::new(Resolver::new(&doc), Box::new(EscapingIdentifiers::default())),
            schemes: IndexMap::new(),
            operation_ids: HashSet::new(),
            default_security: None,
        };

        let content: IndexMap<String, MediaType> = serde_json::from_value(json!({
            "application/xml": {},
            "application/json; charset=utf-8": {}
        }))
        .unwrap();
        let (media, _) = state.pick_media(&content).unwrap();
        assert_eq!(media, "application/json; charset=utf-8");

        let content: IndexMap<String, MediaType> =
            serde_json::from_value(json!({"text/plain": {}, "application/xml": {}})).unwrap();
        let (media, _) = state.pick_media(&content).unwrap();
        assert_eq!(media, "text/plain");
    }
}
