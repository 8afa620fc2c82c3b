use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Json as AxumJson, Response},
};
use serde_json::json;
use std::collections::BTreeMap;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::AppState;

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        let escaped = s.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        s.to_string()
    }
}

pub async fn summary(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let donation_counts: BTreeMap<String, i64> =
        crate::db::donation_status_counts(&state.db).await?.into_iter().collect();
    let request_counts: BTreeMap<String, i64> =
        crate::db::request_status_counts(&state.db).await?.into_iter().collect();
    let donation_total: i64 = donation_counts.values().sum();
    let request_total: i64 = request_counts.values().sum();
    let delivered_matches = crate::db::delivered_match_count(&state.db).await?;
    let top_cities: Vec<_> = crate::db::top_recipient_cities(&state.db, 5)
        .await?
        .into_iter()
        .map(|(city, count)| json!({ "city": city, "count": count }))
        .collect();

    Ok(AxumJson(json!({
        "donation_count": donation_total,
        "donations_by_status": donation_counts,
        "request_count": request_total,
        "requests_by_status": request_counts,
        "delivered_matches": delivered_matches,
        "top_recipient_cities": top_cities,
    })))
}

pub async fn export_csv(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let donations = crate::db::list_donations(&state.db, None, None).await?;

    let mut w = String::new();
    w.push_str("donation_id,donor_id,ngo_id,title,category,quantity,status,created_at\n");
    for d in donations {
        let ngo = d.ngo_id.map(|id| id.to_string()).unwrap_or_default();
        let created = d.created_at.to_rfc3339();
        w.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            d.donation_id,
            d.donor_id,
            csv_escape(&ngo),
            csv_escape(&d.title),
            csv_escape(&d.category),
            d.quantity,
            d.status,
            csv_escape(&created),
        ));
    }

    let mut resp: Response = Response::new(w.into());
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=donations.csv"),
    );
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::csv_escape;

    #[test]
    fn csv_escape_quotes_only_when_needed() {
        assert_eq!(csv_escape("Winter Coats"), "Winter Coats");
        assert_eq!(csv_escape("coats, winter"), "\"coats, winter\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
