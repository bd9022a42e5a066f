//! One generation run: load, analyze, render, write.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{Args, GenConfig, GoEnv, OUTPUT_SUFFIX};
use crate::emit::{render, ClientFile};
use crate::error::{GenError, Result, SignatureError};
use crate::filter::api_methods;
use crate::loader::Loader;
use crate::methodset::{lookup_type, pointer_method_set};
use crate::qualifier::ImportTable;
use crate::signature::parse_method_type;
use crate::types::{PkgRef, Position, Program};

/// One forwarding method of the client. Types are spelled as the generated
/// file writes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMethod {
    pub name: String,
    /// Raw comment text, markers included.
    pub doc: Option<String>,
    pub request: String,
    pub response: Option<String>,
}

/// A server method left out because its signature does not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMethod {
    pub name: String,
    pub pos: Position,
    pub error: SignatureError,
}

#[derive(Debug, Clone, Default)]
pub struct ServerMethods {
    pub methods: Vec<ClientMethod>,
    pub skipped: Vec<SkippedMethod>,
}

/// Client methods for every API method of `*server_type`, in name order.
///
/// Types are qualified through `imports` in method order, request before
/// response. A method whose signature does not fit is logged and skipped;
/// an alias collision ends the run.
pub fn server_methods(
    program: &Program,
    server: &PkgRef,
    server_type: &str,
    imports: &mut ImportTable,
) -> Result<ServerMethods> {
    let named = lookup_type(program, server, server_type)?;
    let mut out = ServerMethods::default();

    for sel in api_methods(pointer_method_set(program, &named)) {
        let mt = match parse_method_type(program, &sel.sig) {
            Ok(mt) => mt,
            Err(error) => {
                warn!(pos = %sel.pos, "ignoring method {}: {error}", sel.name);
                out.skipped.push(SkippedMethod {
                    name: sel.name,
                    pos: sel.pos,
                    error,
                });
                continue;
            }
        };
        let request = imports.type_string(&mt.request)?;
        let response = match &mt.response {
            Some(t) => Some(imports.type_string(t)?),
            None => None,
        };
        debug!(method = %sel.name, recv = %sel.recv, depth = sel.depth, "client method");
        out.methods.push(ClientMethod {
            name: sel.name,
            doc: sel.doc,
            request,
            response,
        });
    }
    Ok(out)
}

/// What to generate and where.
#[derive(Debug, Clone)]
pub struct GenRequest {
    /// Import path, or a `./dir` relative to the working directory.
    pub server_pkg: String,
    pub server_type: String,
    pub client_type: String,
    /// Directory of the package receiving the client.
    pub out_dir: PathBuf,
    pub config: GenConfig,
}

impl From<&Args> for GenRequest {
    fn from(args: &Args) -> Self {
        Self {
            server_pkg: args.server_pkg.clone(),
            server_type: args.server_type.clone(),
            client_type: args.client_type.clone(),
            out_dir: args.out_dir.clone(),
            config: args.gen_config(),
        }
    }
}

/// A rendered client file, not yet written.
#[derive(Debug, Clone)]
pub struct Generated {
    pub file_name: String,
    pub source: String,
    pub methods: Vec<ClientMethod>,
    pub skipped: Vec<SkippedMethod>,
}

pub fn output_file_name(client_type: &str) -> String {
    format!("{}{OUTPUT_SUFFIX}", client_type.to_lowercase())
}

/// Runs the whole pipeline as seen from `cwd`. Nothing is written.
pub fn generate(cwd: &Path, env: GoEnv, req: &GenRequest) -> Result<Generated> {
    let mut loader = Loader::discover(cwd, env)?;
    let out_dir = cwd.join(&req.out_dir);
    let local = loader.local_package(&out_dir)?;
    debug!(path = %local.path, name = %local.name, "destination package");
    let server = loader.load(&req.server_pkg)?;
    let program = loader.into_program();

    let mut imports = ImportTable::seeded(&req.config, &local);
    let found = server_methods(&program, &server, &req.server_type, &mut imports)?;
    if found.methods.is_empty() {
        imports.remove(&req.config.context.path);
    }

    let transport = alias_of(&imports, &req.config.transport);
    let context = alias_of(&imports, &req.config.context);
    let import_list = imports.into_imports();
    let source = render(&ClientFile {
        package: &local.name,
        imports: &import_list,
        client_type: &req.client_type,
        transport: &transport,
        context: &context,
        methods: &found.methods,
    })?;

    Ok(Generated {
        file_name: output_file_name(&req.client_type),
        source,
        methods: found.methods,
        skipped: found.skipped,
    })
}

fn alias_of(imports: &ImportTable, pkg: &PkgRef) -> String {
    imports
        .alias(&pkg.path)
        .map_or_else(|| pkg.name.clone(), str::to_string)
}

/// Writes the file into `dir`, replacing any previous one.
pub fn write_output(dir: &Path, generated: &Generated) -> Result<PathBuf> {
    let path = dir.join(&generated.file_name);
    fs::write(&path, &generated.source).map_err(|source| GenError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), methods = generated.methods.len(), "wrote client");
    Ok(path)
}

/// [`generate`] then [`write_output`] into the request's output directory.
pub fn generate_to_dir(cwd: &Path, env: GoEnv, req: &GenRequest) -> Result<PathBuf> {
    let generated = generate(cwd, env, req)?;
    write_output(&cwd.join(&req.out_dir), &generated)
}
