//! Typed BR Code model, schema validation and classification.
//!
//! [`BrCode::from_tlv`] casts the decoded TLV mapping into the typed model,
//! collecting every field problem into one [`FieldErrors`] set. The code is
//! classified only after field validation succeeds: a `chave` makes it
//! static, a `/cobv` URL makes it dynamic-with-due-date, and any other URL
//! makes it dynamic-immediate.

use rust_decimal::Decimal;
use serde::Serialize;
use url::Url;

use crate::brcode::tlv::{TlvMap, TlvValue};
use crate::error::{FieldErrors, Result};

/// Classification of a validated BR Code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrCodeKind {
    /// Carries the payee key (`chave`) directly; no network fetch needed.
    Static,
    /// Carries a PSP URL for an immediate payment.
    DynamicPaymentImmediate,
    /// Carries a PSP URL ending in `/cobv`: a payment with a due date.
    DynamicPaymentWithDueDate,
}

/// Merchant account information (tag 26).
///
/// Exactly one of [`chave`](Self::chave) and [`url`](Self::url) is present
/// after validation; `info_adicional` only ever accompanies `chave`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantAccountInformation {
    /// Arrangement GUI, `br.gov.bcb.pix` in either case.
    pub gui: String,
    /// Payee key for static codes.
    pub chave: Option<String>,
    /// Free-form additional information, static codes only.
    pub info_adicional: Option<String>,
    /// PSP payload URL for dynamic codes, stored without a scheme.
    pub url: Option<String>,
}

/// Additional data field template (tag 62).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdditionalDataFieldTemplate {
    /// Transaction reference label (child 05).
    pub reference_label: String,
}

/// A validated BR Code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrCode {
    /// Tag 00; always `"01"`.
    pub payload_format_indicator: String,
    /// Tag 01; `"12"` when present.
    pub point_of_initiation_method: Option<String>,
    /// Tag 26.
    pub merchant_account_information: MerchantAccountInformation,
    /// Tag 52; four digits, `"0000"` when absent.
    pub merchant_category_code: String,
    /// Tag 53; always `"986"` (BRL).
    pub transaction_currency: String,
    /// Tag 54.
    pub transaction_amount: Option<Decimal>,
    /// Tag 58; always `"BR"`.
    pub country_code: String,
    /// Tag 59.
    pub merchant_name: String,
    /// Tag 60.
    pub merchant_city: String,
    /// Tag 61; eight characters when present.
    pub postal_code: Option<String>,
    /// Tag 62.
    pub additional_data_field_template: AdditionalDataFieldTemplate,
    /// Tag 63; the four-hex-digit trailer.
    pub crc: String,
    /// Derived classification.
    #[serde(rename = "type")]
    pub kind: BrCodeKind,
}

impl BrCode {
    /// Casts a decoded TLV mapping into a validated `BrCode`.
    ///
    /// # Errors
    ///
    /// Returns [`PixError::Validation`](crate::PixError::Validation) with
    /// every field problem found.
    pub fn from_tlv(map: &TlvMap) -> Result<Self> {
        let mut errors = FieldErrors::new();

        let payload_format_indicator = scalar(map, "payload_format_indicator", &mut errors);
        if let Some(value) = payload_format_indicator.as_deref() {
            if value != "01" {
                errors.push("payload_format_indicator", "must be \"01\"");
            }
        }

        let point_of_initiation_method =
            optional_scalar(map, "point_of_initiation_method", &mut errors);
        if let Some(value) = point_of_initiation_method.as_deref() {
            if value != "12" {
                errors.push("point_of_initiation_method", "must be \"12\" when present");
            }
        }

        let merchant_account_information = merchant_account(map, &mut errors);

        let merchant_category_code = optional_scalar(map, "merchant_category_code", &mut errors)
            .unwrap_or_else(|| "0000".to_owned());
        if merchant_category_code.len() != 4
            || !merchant_category_code.bytes().all(|b| b.is_ascii_digit())
        {
            errors.push("merchant_category_code", "must be four digits");
        }

        let transaction_currency = scalar(map, "transaction_currency", &mut errors);
        if let Some(value) = transaction_currency.as_deref() {
            if value != "986" {
                errors.push("transaction_currency", "must be \"986\"");
            }
        }

        let transaction_amount = optional_scalar(map, "transaction_amount", &mut errors)
            .and_then(|raw| match raw.parse::<Decimal>() {
                Ok(amount) => Some(amount),
                Err(_) => {
                    errors.push("transaction_amount", "is not a decimal amount");
                    None
                }
            });

        let country_code = scalar(map, "country_code", &mut errors);
        if let Some(value) = country_code.as_deref() {
            if value != "BR" {
                errors.push("country_code", "must be \"BR\"");
            }
        }

        let merchant_name = scalar(map, "merchant_name", &mut errors);
        let merchant_city = scalar(map, "merchant_city", &mut errors);

        let postal_code = optional_scalar(map, "postal_code", &mut errors);
        if let Some(value) = postal_code.as_deref() {
            if value.len() != 8 {
                errors.push("postal_code", "must be eight characters");
            }
        }

        let additional_data_field_template = additional_data(map, &mut errors);

        let crc = scalar(map, "crc", &mut errors);

        let kind = merchant_account_information
            .as_ref()
            .map(|mai| classify(mai));

        match (
            payload_format_indicator,
            merchant_account_information,
            transaction_currency,
            country_code,
            merchant_name,
            merchant_city,
            additional_data_field_template,
            crc,
            kind,
        ) {
            (
                Some(payload_format_indicator),
                Some(merchant_account_information),
                Some(transaction_currency),
                Some(country_code),
                Some(merchant_name),
                Some(merchant_city),
                Some(additional_data_field_template),
                Some(crc),
                Some(kind),
            ) if errors.is_empty() => errors.into_result(Self {
                payload_format_indicator,
                point_of_initiation_method,
                merchant_account_information,
                merchant_category_code,
                transaction_currency,
                transaction_amount,
                country_code,
                merchant_name,
                merchant_city,
                postal_code,
                additional_data_field_template,
                crc,
                kind,
            }),
            _ => Err(crate::PixError::Validation(errors)),
        }
    }

    /// Returns the derived classification.
    #[must_use]
    pub fn kind(&self) -> BrCodeKind {
        self.kind
    }

    /// True for both dynamic classifications.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self.kind,
            BrCodeKind::DynamicPaymentImmediate | BrCodeKind::DynamicPaymentWithDueDate
        )
    }

    /// The PSP payload URL with an `https` scheme, for dynamic codes.
    #[must_use]
    pub fn payment_url(&self) -> Option<String> {
        self.merchant_account_information
            .url
            .as_deref()
            .map(|url| format!("https://{url}"))
    }
}

fn classify(mai: &MerchantAccountInformation) -> BrCodeKind {
    if mai.chave.is_some() {
        BrCodeKind::Static
    } else if mai
        .url
        .as_deref()
        .is_some_and(|url| url.to_lowercase().ends_with("/cobv"))
    {
        BrCodeKind::DynamicPaymentWithDueDate
    } else {
        BrCodeKind::DynamicPaymentImmediate
    }
}

fn merchant_account(
    map: &TlvMap,
    errors: &mut FieldErrors,
) -> Option<MerchantAccountInformation> {
    let Some(value) = map.get("merchant_account_information") else {
        errors.push("merchant_account_information", "is required");
        return None;
    };
    let Some(template) = value.as_template() else {
        errors.push("merchant_account_information", "must be a template");
        return None;
    };

    let field = "merchant_account_information";
    let gui = match template.get("gui").and_then(TlvValue::as_value) {
        Some(gui) if gui == "br.gov.bcb.pix" || gui == "BR.GOV.BCB.PIX" => Some(gui.to_owned()),
        Some(_) => {
            errors.push(field, "gui must be br.gov.bcb.pix");
            None
        }
        None => {
            errors.push(field, "gui is required");
            None
        }
    };

    let chave = template.get("chave").and_then(TlvValue::as_value).map(str::to_owned);
    let url = template.get("url").and_then(TlvValue::as_value).map(str::to_owned);
    let info_adicional =
        template.get("info_adicional").and_then(TlvValue::as_value).map(str::to_owned);

    if let Some(chave) = chave.as_deref() {
        if chave.is_empty() || chave.len() > 77 {
            errors.push(field, "chave must be between 1 and 77 characters");
        }
    }
    if let Some(url) = url.as_deref() {
        if url.is_empty() || url.len() > 77 {
            errors.push(field, "url must be between 1 and 77 characters");
        }
    }
    if let Some(info) = info_adicional.as_deref() {
        if info.is_empty() || info.len() > 72 {
            errors.push(field, "info_adicional must be between 1 and 72 characters");
        }
    }

    match (chave.as_deref(), url.as_deref()) {
        (None, None) => errors.push(field, "either chave or url is required"),
        (Some(_), Some(_)) => errors.push(field, "chave and url are mutually exclusive"),
        (Some(chave), None) => {
            let info_len = info_adicional.as_deref().map_or(0, str::len);
            if chave.len() + info_len > 99 {
                errors.push(field, "chave and info_adicional exceed 99 characters combined");
            }
        }
        (None, Some(url)) => {
            if info_adicional.is_some() {
                errors.push(field, "info_adicional is not allowed with url");
            }
            if !url_has_payload_path(url) {
                errors.push(field, "url must carry a payload path");
            }
        }
    }

    gui.map(|gui| MerchantAccountInformation { gui, chave, info_adicional, url })
}

/// A dynamic payload URL must resolve to a path with at least two
/// non-root segments once an `https` scheme is prepended.
fn url_has_payload_path(url: &str) -> bool {
    Url::parse(&format!("https://{url}"))
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).count())
        })
        .is_some_and(|segments| segments >= 2)
}

fn additional_data(
    map: &TlvMap,
    errors: &mut FieldErrors,
) -> Option<AdditionalDataFieldTemplate> {
    let field = "additional_data_field_template";
    let Some(value) = map.get(field) else {
        errors.push(field, "is required");
        return None;
    };
    let Some(template) = value.as_template() else {
        errors.push(field, "must be a template");
        return None;
    };
    match template.get("reference_label").and_then(TlvValue::as_value) {
        Some(label) if !label.is_empty() && label.len() <= 25 => {
            Some(AdditionalDataFieldTemplate { reference_label: label.to_owned() })
        }
        Some(_) => {
            errors.push(field, "reference_label must be between 1 and 25 characters");
            None
        }
        None => {
            errors.push(field, "reference_label is required");
            None
        }
    }
}

fn scalar(map: &TlvMap, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match map.get(field) {
        Some(TlvValue::Value(value)) => Some(value.clone()),
        Some(TlvValue::Template(_)) => {
            errors.push(field, "must be a scalar");
            None
        }
        None => {
            errors.push(field, "is required");
            None
        }
    }
}

fn optional_scalar(map: &TlvMap, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match map.get(field) {
        Some(TlvValue::Value(value)) => Some(value.clone()),
        Some(TlvValue::Template(_)) => {
            errors.push(field, "must be a scalar");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixError;

    fn base_map(mai: &[(&str, &str)]) -> TlvMap {
        let mut template = TlvMap::new();
        for (name, value) in mai {
            template.insert((*name).to_owned(), TlvValue::Value((*value).to_owned()));
        }
        let mut adft = TlvMap::new();
        adft.insert("reference_label".to_owned(), TlvValue::Value("***".to_owned()));

        let mut map = TlvMap::new();
        map.insert("payload_format_indicator".to_owned(), TlvValue::Value("01".to_owned()));
        map.insert("merchant_account_information".to_owned(), TlvValue::Template(template));
        map.insert("transaction_currency".to_owned(), TlvValue::Value("986".to_owned()));
        map.insert("country_code".to_owned(), TlvValue::Value("BR".to_owned()));
        map.insert("merchant_name".to_owned(), TlvValue::Value("Fulano de Tal".to_owned()));
        map.insert("merchant_city".to_owned(), TlvValue::Value("BRASILIA".to_owned()));
        map.insert("additional_data_field_template".to_owned(), TlvValue::Template(adft));
        map.insert("crc".to_owned(), TlvValue::Value("1D3D".to_owned()));
        map
    }

    #[test]
    fn test_static_classification() {
        let map = base_map(&[("gui", "br.gov.bcb.pix"), ("chave", "chave@pix.br")]);
        let brcode = BrCode::from_tlv(&map).unwrap();
        assert_eq!(brcode.kind(), BrCodeKind::Static);
        assert!(!brcode.is_dynamic());
        assert_eq!(brcode.payment_url(), None);
        assert_eq!(brcode.merchant_category_code, "0000");
    }

    #[test]
    fn test_dynamic_immediate_classification() {
        let map = base_map(&[("gui", "br.gov.bcb.pix"), ("url", "psp.br/pix/v2/abc")]);
        let brcode = BrCode::from_tlv(&map).unwrap();
        assert_eq!(brcode.kind(), BrCodeKind::DynamicPaymentImmediate);
        assert!(brcode.is_dynamic());
        assert_eq!(brcode.payment_url().as_deref(), Some("https://psp.br/pix/v2/abc"));
    }

    #[test]
    fn test_cobv_url_classifies_due_date() {
        for url in ["psp.br/pix/cobv", "psp.br/pix/COBV"] {
            let map = base_map(&[("gui", "br.gov.bcb.pix"), ("url", url)]);
            let brcode = BrCode::from_tlv(&map).unwrap();
            assert_eq!(brcode.kind(), BrCodeKind::DynamicPaymentWithDueDate, "url {url}");
        }
    }

    #[test]
    fn test_upper_case_gui_is_accepted() {
        let map = base_map(&[("gui", "BR.GOV.BCB.PIX"), ("chave", "chave@pix.br")]);
        assert!(BrCode::from_tlv(&map).is_ok());
    }

    #[test]
    fn test_chave_and_url_are_mutually_exclusive() {
        let map = base_map(&[
            ("gui", "br.gov.bcb.pix"),
            ("chave", "chave@pix.br"),
            ("url", "psp.br/pix/v2/abc"),
        ]);
        let Err(PixError::Validation(errors)) = BrCode::from_tlv(&map) else {
            panic!("expected validation error");
        };
        assert!(errors.get("merchant_account_information").is_some());
    }

    #[test]
    fn test_info_adicional_requires_chave() {
        let map = base_map(&[
            ("gui", "br.gov.bcb.pix"),
            ("url", "psp.br/pix/v2/abc"),
            ("info_adicional", "extra"),
        ]);
        assert!(BrCode::from_tlv(&map).is_err());
    }

    #[test]
    fn test_chave_plus_info_adicional_combined_length() {
        let chave = "a".repeat(60);
        let info = "b".repeat(40);
        let map = base_map(&[
            ("gui", "br.gov.bcb.pix"),
            ("chave", &chave),
            ("info_adicional", &info),
        ]);
        assert!(BrCode::from_tlv(&map).is_err());

        let info_ok = "b".repeat(39);
        let map = base_map(&[
            ("gui", "br.gov.bcb.pix"),
            ("chave", &chave),
            ("info_adicional", &info_ok),
        ]);
        assert!(BrCode::from_tlv(&map).is_ok());
    }

    #[test]
    fn test_url_needs_two_path_segments() {
        let map = base_map(&[("gui", "br.gov.bcb.pix"), ("url", "psp.br/pix")]);
        assert!(BrCode::from_tlv(&map).is_err());

        let map = base_map(&[("gui", "br.gov.bcb.pix"), ("url", "psp.br")]);
        assert!(BrCode::from_tlv(&map).is_err());
    }

    #[test]
    fn test_errors_are_accumulated() {
        let mut map = base_map(&[("gui", "nope")]);
        map.insert("transaction_currency".to_owned(), TlvValue::Value("840".to_owned()));
        map.insert("postal_code".to_owned(), TlvValue::Value("123".to_owned()));

        let Err(PixError::Validation(errors)) = BrCode::from_tlv(&map) else {
            panic!("expected validation error");
        };
        assert!(errors.get("merchant_account_information").is_some());
        assert!(errors.get("transaction_currency").is_some());
        assert!(errors.get("postal_code").is_some());
    }

    #[test]
    fn test_invalid_amount_is_a_field_error() {
        let mut map = base_map(&[("gui", "br.gov.bcb.pix"), ("chave", "chave@pix.br")]);
        map.insert("transaction_amount".to_owned(), TlvValue::Value("12,50".to_owned()));
        let Err(PixError::Validation(errors)) = BrCode::from_tlv(&map) else {
            panic!("expected validation error");
        };
        assert!(errors.get("transaction_amount").is_some());
    }
}
