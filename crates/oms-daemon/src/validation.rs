//! Request-body and query-string validation.
//!
//! Failures are `Validation` errors worded `"<field>: <message>"`. Only the
//! first failing field is reported, checked in declaration order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use oms_domain::fixedpoint::float_to_decimal_text;
use oms_domain::{
    AssetFilter, OmsError, OrderFilter, OrderSide, OrderStatus, PageRequest, Price, Quantity,
    SortDirection, ASSET_NAME_PATTERN, PRICE_SCALE, QUANTITY_SCALE,
};

pub const MALFORMED_BODY: &str = "Malformed JSON request";

/// A create-order body that passed every field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub asset_name: String,
    pub side: OrderSide,
    pub size: Quantity,
    pub price: Price,
}

fn invalid(field: &str, message: impl std::fmt::Display) -> OmsError {
    OmsError::Validation(format!("{field}: {message}"))
}

fn present<'a>(body: &'a Value, field: &str) -> Option<&'a Value> {
    body.get(field).filter(|v| !v.is_null())
}

pub fn create_order_request(body: &Value) -> Result<CreateOrderRequest, OmsError> {
    if !body.is_object() {
        return Err(OmsError::Validation(MALFORMED_BODY.to_string()));
    }

    let customer_id = match present(body, "customerId") {
        None => return Err(invalid("customerId", "must not be null")),
        Some(v) => v
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| invalid("customerId", "must be a valid UUID"))?,
    };

    let asset_name = match present(body, "assetName").map(Value::as_str) {
        None => return Err(invalid("assetName", "must not be blank")),
        Some(None) => return Err(invalid("assetName", "must be a string")),
        Some(Some(s)) if s.trim().is_empty() => return Err(invalid("assetName", "must not be blank")),
        Some(Some(s)) => s.to_string(),
    };
    if oms_domain::validate_asset_name(&asset_name).is_err() {
        return Err(invalid("assetName", format!("must match \"{ASSET_NAME_PATTERN}\"")));
    }

    let side = match present(body, "side") {
        None => return Err(invalid("side", "must not be null")),
        Some(v) => v
            .as_str()
            .and_then(|s| OrderSide::parse(s).ok())
            .ok_or_else(|| invalid("side", "must be one of BUY, SELL"))?,
    };

    let size = Quantity::from_raw(bounded_decimal(body, "size", QUANTITY_SCALE, |s, f| {
        Quantity::parse(s, f).map(Quantity::raw)
    })?);
    let price = Price::from_raw(bounded_decimal(body, "price", PRICE_SCALE, |s, f| {
        Price::parse(s, f).map(Price::raw)
    })?);

    Ok(CreateOrderRequest {
        customer_id,
        asset_name,
        side,
        size,
        price,
    })
}

/// Whole-number digits that always fit an i64 at `scale` fraction digits
/// (12 for quantities, 14 for prices).
fn integer_digits_for(scale: u32) -> usize {
    (i64::MAX / 10_i64.pow(scale)).to_string().len() - 1
}

/// A positive decimal with at most `scale` fraction digits, as a raw integer
/// at that scale. The smallest accepted value is one unit of the last digit.
fn bounded_decimal(
    body: &Value,
    field: &str,
    scale: u32,
    parse: fn(&str, &str) -> Result<i64, OmsError>,
) -> Result<i64, OmsError> {
    let text = match present(body, field) {
        None => return Err(invalid(field, "must not be null")),
        Some(Value::String(s)) => s.trim().to_string(),
        // serde_json prints small and large floats with an exponent.
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.is_finite() => float_to_decimal_text(f),
            _ => return Err(invalid(field, "must be a decimal number")),
        },
        Some(_) => return Err(invalid(field, "must be a decimal number")),
    };
    let integer_digits = integer_digits_for(scale);

    let out_of_bounds = || {
        invalid(
            field,
            format!("numeric value out of bounds (<{integer_digits} digits>.<{scale} digits> expected)"),
        )
    };
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let whole_digits = whole
        .trim_start_matches(&['+', '-'][..])
        .trim_start_matches('0')
        .len();
    if fraction.len() > scale as usize || whole_digits > integer_digits {
        return Err(out_of_bounds());
    }

    let raw = parse(&text, field).map_err(|e| match e.message() {
        m if m.ends_with("out of range") => out_of_bounds(),
        _ => invalid(field, "must be a decimal number"),
    })?;

    if raw < 1 {
        let min = format!("0.{:0>width$}", 1, width = scale as usize);
        return Err(invalid(field, format!("must be greater than or equal to {min}")));
    }
    Ok(raw)
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

pub type QueryParams = HashMap<String, String>;

fn required<'a>(params: &'a QueryParams, name: &str) -> Result<&'a str, OmsError> {
    params
        .get(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            OmsError::Validation(format!("Required request parameter '{name}' is not present"))
        })
}

pub fn required_uuid(params: &QueryParams, name: &str) -> Result<Uuid, OmsError> {
    Uuid::parse_str(required(params, name)?).map_err(|_| invalid(name, "must be a valid UUID"))
}

/// ISO-8601 instant with offset, e.g. `2024-01-01T00:00:00Z`.
pub fn required_instant(params: &QueryParams, name: &str) -> Result<DateTime<Utc>, OmsError> {
    DateTime::parse_from_rfc3339(required(params, name)?)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| invalid(name, "must be an ISO-8601 date-time"))
}

fn optional<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn optional_u32(params: &QueryParams, name: &str, default: u32) -> Result<u32, OmsError> {
    match optional(params, name) {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| invalid(name, "must be a non-negative integer")),
    }
}

/// `page`, `size` and `sort` (`createdAt`, `createdAt,asc`, `asc`, ...).
/// Results are always ordered by creation time; descending by default.
pub fn page_request(params: &QueryParams) -> Result<PageRequest, OmsError> {
    let page = optional_u32(params, "page", 0)?;
    let size = optional_u32(params, "size", 0)?;
    let direction = match optional(params, "sort") {
        None => SortDirection::Desc,
        Some(sort) => {
            let mut direction = SortDirection::Desc;
            for part in sort.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if part == "createdAt" {
                    continue;
                }
                direction = SortDirection::parse(part)
                    .ok_or_else(|| invalid("sort", format!("unsupported sort '{part}'")))?;
            }
            direction
        }
    };
    Ok(PageRequest::new(page, size, direction))
}

pub fn order_query(params: &QueryParams) -> Result<(OrderFilter, PageRequest), OmsError> {
    let customer_id = required_uuid(params, "customerId")?;
    let from = required_instant(params, "from")?;
    let to = required_instant(params, "to")?;
    let status = optional(params, "status")
        .map(|s| OrderStatus::parse(s).map_err(|_| invalid("status", "must be one of PENDING, MATCHED, CANCELED")))
        .transpose()?;
    let filter = OrderFilter::new(customer_id, from, to)
        .with_status(status)
        .with_asset_name(optional(params, "assetName"));
    Ok((filter, page_request(params)?))
}

pub fn asset_query(params: &QueryParams) -> Result<(AssetFilter, PageRequest), OmsError> {
    let filter = AssetFilter {
        customer_id: required_uuid(params, "customerId")?,
        from: required_instant(params, "from")?,
        to: required_instant(params, "to")?,
    };
    Ok((filter, page_request(params)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "customerId": "00000000-0000-0000-0000-000000000001",
            "assetName": "XYZ",
            "side": "BUY",
            "size": "2.5",
            "price": 10.25
        })
    }

    fn message(body: Value) -> String {
        create_order_request(&body).unwrap_err().message().to_string()
    }

    #[test]
    fn valid_body_parses() {
        let req = create_order_request(&valid()).unwrap();
        assert_eq!(req.side, OrderSide::Buy);
        assert_eq!(req.size.raw(), 2_500_000);
        assert_eq!(req.price.raw(), 102_500);
    }

    #[test]
    fn first_failing_field_is_reported() {
        let mut body = valid();
        body["customerId"] = Value::Null;
        body["assetName"] = json!("");
        assert_eq!(message(body), "customerId: must not be null");

        let mut body = valid();
        body["assetName"] = json!("  ");
        assert_eq!(message(body), "assetName: must not be blank");

        let mut body = valid();
        body["assetName"] = json!("xyz");
        assert_eq!(message(body), "assetName: must match \"[A-Z0-9_]{2,16}\"");

        let mut body = valid();
        body.as_object_mut().unwrap().remove("side");
        assert_eq!(message(body), "side: must not be null");
    }

    #[test]
    fn amounts_respect_minimum_and_scale() {
        let mut body = valid();
        body["size"] = json!("0");
        assert_eq!(message(body), "size: must be greater than or equal to 0.000001");

        let mut body = valid();
        body["size"] = json!("1.0000001");
        assert_eq!(
            message(body),
            "size: numeric value out of bounds (<12 digits>.<6 digits> expected)"
        );

        let mut body = valid();
        body["price"] = json!("-1");
        assert_eq!(message(body), "price: must be greater than or equal to 0.0001");

        let mut body = valid();
        body["price"] = json!("1.00001");
        assert_eq!(
            message(body),
            "price: numeric value out of bounds (<14 digits>.<4 digits> expected)"
        );

        let mut body = valid();
        body["price"] = json!(true);
        assert_eq!(message(body), "price: must be a decimal number");
    }

    #[test]
    fn json_numbers_at_the_minimum_are_accepted() {
        let mut body = valid();
        body["size"] = json!(0.000001);
        body["price"] = json!(0.0001);
        let req = create_order_request(&body).unwrap();
        assert_eq!(req.size, Quantity::from_raw(1));
        assert_eq!(req.price, Price::from_raw(1));

        let mut body = valid();
        body["size"] = json!(0.000005);
        body["price"] = json!(12);
        let req = create_order_request(&body).unwrap();
        assert_eq!(req.size, Quantity::from_raw(5));
        assert_eq!(req.price, Price::parse("12", "price").unwrap());
    }

    #[test]
    fn oversized_amounts_report_the_bounds() {
        let mut body = valid();
        body["size"] = json!(1e16);
        assert_eq!(
            message(body),
            "size: numeric value out of bounds (<12 digits>.<6 digits> expected)"
        );

        let mut body = valid();
        body["size"] = json!("999999999999.5");
        assert!(create_order_request(&body).is_ok());

        let mut body = valid();
        body["price"] = json!("1000000000000000");
        assert_eq!(
            message(body),
            "price: numeric value out of bounds (<14 digits>.<4 digits> expected)"
        );

        let mut body = valid();
        body["size"] = json!(0.0000001);
        assert_eq!(
            message(body),
            "size: numeric value out of bounds (<12 digits>.<6 digits> expected)"
        );
    }

    #[test]
    fn query_requires_customer_and_window() {
        let mut params = QueryParams::new();
        let err = order_query(&params).unwrap_err();
        assert_eq!(err.message(), "Required request parameter 'customerId' is not present");

        params.insert("customerId".into(), Uuid::nil().to_string());
        params.insert("from".into(), "2024-01-01T00:00:00Z".into());
        params.insert("to".into(), "yesterday".into());
        assert_eq!(
            order_query(&params).unwrap_err().message(),
            "to: must be an ISO-8601 date-time"
        );

        params.insert("to".into(), "2024-02-01T00:00:00+03:00".into());
        params.insert("status".into(), "PENDING".into());
        params.insert("assetName".into(), "xy".into());
        params.insert("sort".into(), "createdAt,asc".into());
        params.insert("size".into(), "5".into());
        let (filter, page) = order_query(&params).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Pending));
        assert_eq!(filter.asset_name.as_deref(), Some("xy"));
        assert_eq!(page.direction, SortDirection::Asc);
        assert_eq!(page.size, 5);
    }

    #[test]
    fn sort_rejects_unknown_direction() {
        let mut params = QueryParams::new();
        params.insert("sort".into(), "createdAt,sideways".into());
        assert!(page_request(&params).is_err());
        params.insert("sort".into(), "DESC".into());
        assert_eq!(page_request(&params).unwrap().direction, SortDirection::Desc);
    }
}
