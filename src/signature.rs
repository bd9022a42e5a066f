//! Calling convention of a server method.
//!
//! A method maps onto one RPC when it looks like
//!
//! ```go
//! func (s *Server) M([ctx,] p *Params) [(Resp, error) | error]
//! ```
//!
//! where `Params` is a named struct type whose package was loaded from
//! source and `Resp` is not a struct or interface literal.

use crate::error::SignatureError;
use crate::types::{Param, Program, Signature, Type};

/// Request and response types of an accepted method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodType {
    /// The pointed-to params type, without the `*`.
    pub request: Type,
    /// `None` for methods that only return `error`.
    pub response: Option<Type>,
}

pub fn parse_method_type(program: &Program, sig: &Signature) -> Result<MethodType, SignatureError> {
    let request = request_type(program, &sig.params)?;
    let response = response_type(program, &sig.results)?;
    Ok(MethodType { request, response })
}

fn request_type(program: &Program, params: &[Param]) -> Result<Type, SignatureError> {
    let last = match params {
        [p] | [_, p] => &p.typ,
        _ => return Err(SignatureError::ArgumentCount),
    };
    let Type::Pointer(elem) = program.unalias(last) else {
        return Err(SignatureError::NotPointer);
    };
    let request = *elem;

    // the first parameter, a context by convention, is never inspected
    match program.unalias(&request) {
        Type::Struct(_) => return Err(SignatureError::LiteralParameter(request.to_string())),
        Type::Named(n) if program.is_opaque(&n.pkg) => {
            return Err(SignatureError::OpaqueParameter(request.to_string()))
        }
        _ => {}
    }
    match program.underlying(&request) {
        Type::Struct(_) => Ok(request),
        _ => Err(SignatureError::NotStructPointer(request.to_string())),
    }
}

fn response_type(program: &Program, results: &[Param]) -> Result<Option<Type>, SignatureError> {
    match results {
        [] | [_] => Ok(None),
        [resp, err] => {
            if program.unalias(&err.typ) != Type::Basic("error") {
                return Err(SignatureError::SecondResult(err.typ.to_string()));
            }
            match program.unalias(&resp.typ) {
                Type::Struct(_) | Type::Interface(_) => {
                    Err(SignatureError::LiteralResponse(resp.typ.to_string()))
                }
                _ => Ok(Some(resp.typ.clone())),
            }
        }
        _ => Err(SignatureError::ResultCount),
    }
}
