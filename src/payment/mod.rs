//! Dynamic PIX payment document model and validation.
//!
//! The JWS payload of a dynamic code decodes to a payment document in the
//! central bank's API shape (`calendario`, `devedor`, `valor`, …).
//! [`PixPayment::cast`] walks the JSON value field by field and reports
//! every problem in one [`PixError::Validation`], per the crate-wide
//! accumulating-cast contract.

pub mod documents;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FieldErrors, PixError, Result};

/// Default charge expiration in seconds when `calendario.expiracao` is
/// absent.
const DEFAULT_EXPIRACAO: u32 = 86_400;

/// Maximum `solicitacaoPagador` length.
const MAX_SOLICITACAO: usize = 140;

/// Charge status as reported by the PSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixStatus {
    /// The charge is open for payment.
    #[serde(rename = "ATIVA")]
    Ativa,
    /// The charge was paid.
    #[serde(rename = "CONCLUIDA")]
    Concluida,
    /// The payee removed the charge.
    #[serde(rename = "REMOVIDA_PELO_USUARIO_RECEBEDOR")]
    RemovidaPeloUsuarioRecebedor,
    /// The PSP removed the charge.
    #[serde(rename = "REMOVIDA_PELO_PSP")]
    RemovidaPeloPsp,
}

impl PixStatus {
    fn from_wire(value: &str) -> Option<Self> {
        match value {
            "ATIVA" => Some(Self::Ativa),
            "CONCLUIDA" => Some(Self::Concluida),
            "REMOVIDA_PELO_USUARIO_RECEBEDOR" => Some(Self::RemovidaPeloUsuarioRecebedor),
            "REMOVIDA_PELO_PSP" => Some(Self::RemovidaPeloPsp),
            _ => None,
        }
    }
}

/// Charge calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Calendario {
    /// When the charge was created.
    pub criacao: DateTime<Utc>,
    /// When the charge was presented to the payer.
    pub apresentacao: DateTime<Utc>,
    /// Charge lifetime in seconds after `criacao`.
    pub expiracao: u32,
}

/// The payer's taxpayer document, selected by field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Documento {
    /// Individual taxpayer ID.
    #[serde(rename = "cpf")]
    Cpf(String),
    /// Corporate taxpayer ID.
    #[serde(rename = "cnpj")]
    Cnpj(String),
}

/// The payer, when the charge names one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Devedor {
    /// Payer name.
    pub nome: String,
    /// Exactly one of CPF or CNPJ.
    #[serde(flatten)]
    pub documento: Documento,
}

/// Charge amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Valor {
    /// Original amount; strictly positive.
    pub original: Decimal,
}

/// A free-form name/value annotation on the charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoAdicional {
    /// Annotation name.
    pub nome: String,
    /// Annotation value.
    pub valor: String,
}

/// A validated dynamic PIX payment document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixPayment {
    /// Document revision; starts at zero.
    pub revisao: u32,
    /// Charge calendar.
    pub calendario: Calendario,
    /// The payer, when named.
    pub devedor: Option<Devedor>,
    /// Charge amount.
    pub valor: Valor,
    /// Payee key.
    pub chave: String,
    /// Transaction identifier, 26 to 35 characters.
    pub txid: String,
    /// Charge status.
    pub status: PixStatus,
    /// Message from payee to payer, up to 140 characters.
    #[serde(rename = "solicitacaoPagador")]
    pub solicitacao_pagador: Option<String>,
    /// Annotations; `null` on the wire coerces to empty.
    #[serde(rename = "infoAdicionais")]
    pub info_adicionais: Vec<InfoAdicional>,
}

impl PixPayment {
    /// Casts a decoded JSON payment document, collecting every field
    /// problem.
    ///
    /// An explicitly `null` `infoAdicionais` is coerced to the empty list
    /// before validation (a known PSP quirk: some emit `null` instead of
    /// omitting the field).
    ///
    /// # Errors
    ///
    /// Returns [`PixError::Validation`] with the accumulated field errors.
    pub fn cast(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(PixError::field("payment", "must be a JSON object"));
        };
        let mut errors = FieldErrors::new();

        let revisao = match object.get("revisao") {
            Some(value) => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
                Some(revisao) => Some(revisao),
                None => {
                    errors.push("revisao", "must be a non-negative integer");
                    None
                }
            },
            None => {
                errors.push("revisao", "is required");
                None
            }
        };

        let calendario = cast_calendario(object.get("calendario"), &mut errors);
        let devedor = cast_devedor(object.get("devedor"), &mut errors);
        let valor = cast_valor(object.get("valor"), &mut errors);

        let chave = match object.get("chave").and_then(Value::as_str) {
            Some(chave) if !chave.is_empty() => Some(chave.to_owned()),
            _ => {
                errors.push("chave", "is required");
                None
            }
        };

        let txid = match object.get("txid").and_then(Value::as_str) {
            Some(txid) if (26..=35).contains(&txid.len()) => Some(txid.to_owned()),
            Some(_) => {
                errors.push("txid", "must be between 26 and 35 characters");
                None
            }
            None => {
                errors.push("txid", "is required");
                None
            }
        };

        let status = match object.get("status").and_then(Value::as_str) {
            Some(raw) => match PixStatus::from_wire(raw) {
                Some(status) => Some(status),
                None => {
                    errors.push("status", "is not a known charge status");
                    None
                }
            },
            None => {
                errors.push("status", "is required");
                None
            }
        };

        let solicitacao_pagador = match object.get("solicitacaoPagador") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) if message.chars().count() <= MAX_SOLICITACAO => {
                Some(message.clone())
            }
            Some(Value::String(_)) => {
                errors.push("solicitacaoPagador", "must be at most 140 characters");
                None
            }
            Some(_) => {
                errors.push("solicitacaoPagador", "must be a string");
                None
            }
        };

        let info_adicionais = cast_info_adicionais(object.get("infoAdicionais"), &mut errors);

        match (revisao, calendario, valor, chave, txid, status, info_adicionais) {
            (
                Some(revisao),
                Some(calendario),
                Some(valor),
                Some(chave),
                Some(txid),
                Some(status),
                Some(info_adicionais),
            ) if errors.is_empty() => errors.into_result(Self {
                revisao,
                calendario,
                devedor: devedor.flatten(),
                valor,
                chave,
                txid,
                status,
                solicitacao_pagador,
                info_adicionais,
            }),
            _ => Err(PixError::Validation(errors)),
        }
    }
}

fn cast_calendario(value: Option<&Value>, errors: &mut FieldErrors) -> Option<Calendario> {
    let Some(value) = value else {
        errors.push("calendario", "is required");
        return None;
    };
    let Some(object) = value.as_object() else {
        errors.push("calendario", "must be a JSON object");
        return None;
    };

    let criacao = cast_timestamp(object.get("criacao"), "calendario.criacao", errors);
    let apresentacao =
        cast_timestamp(object.get("apresentacao"), "calendario.apresentacao", errors);

    let expiracao = match object.get("expiracao") {
        None | Some(Value::Null) => Some(DEFAULT_EXPIRACAO),
        Some(value) => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(expiracao) => Some(expiracao),
            None => {
                errors.push("calendario.expiracao", "must be a non-negative integer");
                None
            }
        },
    };

    match (criacao, apresentacao, expiracao) {
        (Some(criacao), Some(apresentacao), Some(expiracao)) => {
            Some(Calendario { criacao, apresentacao, expiracao })
        }
        _ => None,
    }
}

fn cast_timestamp(
    value: Option<&Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<DateTime<Utc>> {
    match value.and_then(Value::as_str) {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
            Err(_) => {
                errors.push(field, "is not an RFC 3339 timestamp");
                None
            }
        },
        None => {
            errors.push(field, "is required");
            None
        }
    }
}

/// Casts `devedor`. Outer `Option`: whether casting succeeded; inner:
/// whether the document names a payer at all.
fn cast_devedor(value: Option<&Value>, errors: &mut FieldErrors) -> Option<Option<Devedor>> {
    let value = match value {
        None | Some(Value::Null) => return Some(None),
        Some(value) => value,
    };
    let Some(object) = value.as_object() else {
        errors.push("devedor", "must be a JSON object");
        return None;
    };

    let nome = match object.get("nome").and_then(Value::as_str) {
        Some(nome) if !nome.is_empty() => Some(nome.to_owned()),
        _ => {
            errors.push("devedor.nome", "is required");
            None
        }
    };

    let cpf = object.get("cpf").and_then(Value::as_str);
    let cnpj = object.get("cnpj").and_then(Value::as_str);

    // The field name picks the algorithm; length never does.
    let documento = match (cpf, cnpj) {
        (Some(cpf), None) => {
            if documents::valid_cpf(cpf) {
                Some(Documento::Cpf(cpf.to_owned()))
            } else {
                errors.push("devedor.cpf", "is not a valid CPF");
                None
            }
        }
        (None, Some(cnpj)) => {
            if documents::valid_cnpj(cnpj) {
                Some(Documento::Cnpj(cnpj.to_owned()))
            } else {
                errors.push("devedor.cnpj", "is not a valid CNPJ");
                None
            }
        }
        (Some(_), Some(_)) => {
            errors.push("devedor", "cpf and cnpj are mutually exclusive");
            None
        }
        (None, None) => {
            errors.push("devedor", "either cpf or cnpj is required");
            None
        }
    };

    match (nome, documento) {
        (Some(nome), Some(documento)) => Some(Some(Devedor { nome, documento })),
        _ => None,
    }
}

fn cast_valor(value: Option<&Value>, errors: &mut FieldErrors) -> Option<Valor> {
    let Some(value) = value else {
        errors.push("valor", "is required");
        return None;
    };
    let Some(object) = value.as_object() else {
        errors.push("valor", "must be a JSON object");
        return None;
    };

    let raw = match object.get("original") {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => {
            errors.push("valor.original", "is required");
            return None;
        }
    };
    match raw.parse::<Decimal>() {
        Ok(original) if original > Decimal::ZERO => Some(Valor { original }),
        Ok(_) => {
            errors.push("valor.original", "must be greater than zero");
            None
        }
        Err(_) => {
            errors.push("valor.original", "is not a decimal amount");
            None
        }
    }
}

fn cast_info_adicionais(
    value: Option<&Value>,
    errors: &mut FieldErrors,
) -> Option<Vec<InfoAdicional>> {
    let entries = match value {
        None | Some(Value::Null) => return Some(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            errors.push("infoAdicionais", "must be a list");
            return None;
        }
    };

    let mut infos = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let nome = entry.get("nome").and_then(Value::as_str);
        let valor = entry.get("valor").and_then(Value::as_str);
        match (nome, valor) {
            (Some(nome), Some(valor)) => {
                infos.push(InfoAdicional { nome: nome.to_owned(), valor: valor.to_owned() });
            }
            _ => {
                errors.push(
                    format!("infoAdicionais[{index}]"),
                    "must carry nome and valor",
                );
            }
        }
    }
    if infos.len() == entries.len() {
        Some(infos)
    } else {
        None
    }
}
