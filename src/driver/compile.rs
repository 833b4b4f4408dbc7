use crate::core::diag::CompileError;
use crate::core::lexer::Lexer;
use crate::core::parse::{ParseError, Parser};
use crate::core::resolve::{ResolvedModule, resolve};
use crate::core::typecheck::{TypeMap, TypecheckOutput, check_module};

/// A fully-checked module: the resolved declarations plus the node-type side
/// table, along with any diagnostics the parser recovered from.
pub struct CheckedModule {
    pub resolved: ResolvedModule,
    pub types: TypeMap,
    pub parse_diags: Vec<ParseError>,
}

/// Runs the full pipeline, failing on the first stage with errors.
pub fn check_source(source: &str) -> Result<CheckedModule, CompileError> {
    let (resolved, output, parse_diags) = check_source_partial(source)?;
    if !output.errors.is_empty() {
        return Err(CompileError::TypeCheck(output.errors));
    }
    Ok(CheckedModule {
        resolved,
        types: output.types,
        parse_diags,
    })
}

/// Like [`check_source`], but returns the type checker's output even when it
/// contains errors; lex/parse/resolve failures still abort.
pub fn check_source_partial(
    source: &str,
) -> Result<(ResolvedModule, TypecheckOutput, Vec<ParseError>), CompileError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(&tokens);
    let module = parser.parse()?;
    let parse_diags = parser.take_recovered();
    let resolved = resolve(module).map_err(CompileError::Resolve)?;
    let output = check_module(&resolved);
    Ok((resolved, output, parse_diags))
}
