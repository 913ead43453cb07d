//! Sales analytics executors.
//!
//! Each executor fetches raw rows through the [`MerchantData`] collaborator
//! and does its counting and grouping in memory. Time windows are relative
//! to the current moment, except weekly bucketing, which stays anchored to a
//! fixed reference Monday so that the same days always group together.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Timelike, Utc};
use serde_json::{json, Value};

use crate::context::MerchantContext;
use crate::datastore::{MerchantData, OrderRow};
use crate::tools::{stable_id, ClientAction, ToolResult};

/// Reference Monday anchoring the 7-day sales buckets. Weeks run
/// Monday..Sunday relative to this date, not to the natural calendar week.
const WEEK_ANCHOR: NaiveDate = match NaiveDate::from_ymd_opt(2023, 12, 4) {
    Some(date) => date,
    None => panic!("invalid week anchor"),
};

const TOP_ITEM_LIMIT: usize = 5;

/// `get_top_selling_items`: most-ordered items over the last 7 or 30 days.
pub async fn top_selling_items(
    data: &dyn MerchantData,
    args: &Value,
    ctx: &MerchantContext,
) -> ToolResult {
    let period = match args.get("time_period").and_then(|v| v.as_str()) {
        Some(p @ ("week" | "month")) => p,
        _ => return ToolResult::failure("Missing or invalid 'time_period' parameter"),
    };
    let days = if period == "week" { 7 } else { 30 };

    let end = Utc::now();
    let start = end - Duration::days(days);

    let orders = match data.orders_in_window(&ctx.merchant_id, start, end).await {
        Ok(orders) => orders,
        Err(e) => return ToolResult::failure(e.to_string()),
    };

    if orders.is_empty() {
        log::info!(
            "No orders for merchant {} in the last {} days",
            ctx.merchant_id,
            days
        );
        return ToolResult::success()
            .with_field("items", json!([]))
            .with_field("period", json!(period));
    }

    let order_ids: Vec<String> = orders.into_iter().map(|o| o.order_id).collect();
    let sales = match data.items_for_orders(&ctx.merchant_id, &order_ids).await {
        Ok(sales) => sales,
        Err(e) => return ToolResult::failure(e.to_string()),
    };

    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    for sale in &sales {
        *counts.entry(sale.item_id).or_insert(0) += 1;
    }

    // Count descending; ties break to the smaller item id.
    let mut ranked: Vec<(i64, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(TOP_ITEM_LIMIT);

    if ranked.is_empty() {
        return ToolResult::success()
            .with_field("items", json!([]))
            .with_field("period", json!(period));
    }

    let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
    let catalogue = match data.item_names(&ids).await {
        Ok(rows) => rows,
        Err(e) => return ToolResult::failure(e.to_string()),
    };

    let items: Vec<Value> = ranked
        .iter()
        .map(|(id, count)| {
            let name = catalogue
                .iter()
                .find(|row| row.item_id == *id)
                .map(|row| row.item_name.clone())
                .unwrap_or_else(|| format!("Unknown Item ({})", id));
            json!({"name": name, "count": count})
        })
        .collect();

    let names: Vec<&str> = items
        .iter()
        .filter_map(|i| i["name"].as_str())
        .collect();
    let id = stable_id(&[
        "top-items",
        &ctx.merchant_id,
        period,
        &names.join("|"),
    ]);

    let title = if period == "week" {
        "Top Selling Items (This Week)"
    } else {
        "Top Selling Items (This Month)"
    };

    let chart_data: Vec<Value> = items
        .iter()
        .map(|i| json!({"name": i["name"], "value": i["count"]}))
        .collect();

    ToolResult::success()
        .with_field("items", json!(items))
        .with_field("period", json!(period))
        .with_id(id.clone())
        .with_client_action(ClientAction::new(
            ClientAction::ADD_DATA_WINDOW,
            json!({
                "visualization_type": "chart",
                "title": title,
                "id": id,
                "data": {
                    "chartData": chart_data,
                    "topItems": items,
                    "period": period,
                    "merchant": ctx.merchant_name,
                },
            }),
        ))
}

/// `get_best_selling_day`: the calendar day with the highest summed order
/// value over the last 30 days. Ties resolve to the earliest date.
pub async fn best_selling_day(data: &dyn MerchantData, ctx: &MerchantContext) -> ToolResult {
    let end = Utc::now();
    let start = end - Duration::days(30);

    let orders = match data.orders_in_window(&ctx.merchant_id, start, end).await {
        Ok(orders) => orders,
        Err(e) => return ToolResult::failure(e.to_string()),
    };

    if orders.is_empty() {
        return ToolResult::success().with_field("best_day", Value::Null);
    }

    let mut daily_totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for order in &orders {
        *daily_totals
            .entry(order.order_time.date_naive())
            .or_insert(0.0) += order.order_value;
    }

    // BTreeMap iterates in date order; strict comparison keeps the earliest
    // date when totals tie.
    let mut best: Option<(NaiveDate, f64)> = None;
    for (date, total) in &daily_totals {
        match best {
            Some((_, best_total)) if *total <= best_total => {}
            _ => best = Some((*date, *total)),
        }
    }
    let (date, total) = match best {
        Some(found) => found,
        None => return ToolResult::success().with_field("best_day", Value::Null),
    };

    let day_label = date.format("%Y-%m-%d").to_string();
    let weekday = date.format("%A").to_string();
    let id = stable_id(&["best-day", &ctx.merchant_id, &day_label]);

    ToolResult::success()
        .with_field("best_day", json!(day_label))
        .with_field("day_of_week", json!(weekday))
        .with_field("total_value", json!((total * 100.0).round() / 100.0))
        .with_id(id.clone())
        .with_client_action(ClientAction::new(
            ClientAction::ADD_DATA_WINDOW,
            json!({
                "visualization_type": "stats",
                "title": "Best Selling Day",
                "id": id,
                "data": {
                    "statData": [
                        {"label": "Best day", "value": format!("{} ({})", weekday, day_label)},
                        {"label": "Total sales", "value": format!("{:.2}", total)},
                    ],
                    "merchant": ctx.merchant_name,
                },
            }),
        ))
}

/// `get_weekly_sales`: order value bucketed into anchored 7-day windows over
/// the last 8 weeks, plus the peak ordering hour across the same rows.
pub async fn weekly_sales(data: &dyn MerchantData, ctx: &MerchantContext) -> ToolResult {
    let end = Utc::now();
    let start = end - Duration::days(56);

    let orders = match data.orders_in_window(&ctx.merchant_id, start, end).await {
        Ok(orders) => orders,
        Err(e) => return ToolResult::failure(e.to_string()),
    };

    if orders.is_empty() {
        return ToolResult::success().with_field("weeks", json!([]));
    }

    let mut weekly_totals: BTreeMap<i64, f64> = BTreeMap::new();
    let mut hour_counts: [usize; 24] = [0; 24];
    for order in &orders {
        let bucket = week_bucket(order);
        *weekly_totals.entry(bucket).or_insert(0.0) += order.order_value;
        hour_counts[order.order_time.hour() as usize] += 1;
    }

    let weeks: Vec<Value> = weekly_totals
        .iter()
        .map(|(bucket, total)| {
            let week_start = WEEK_ANCHOR + Duration::days(bucket * 7);
            json!({
                "week_start": week_start.format("%Y-%m-%d").to_string(),
                "total": (total * 100.0).round() / 100.0,
            })
        })
        .collect();

    // Earliest hour wins a tie.
    let peak_hour = hour_counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(hour, _)| hour)
        .unwrap_or(0);
    let peak_label = format!("{:02}:00", peak_hour);

    let labels: Vec<String> = weeks
        .iter()
        .filter_map(|w| w["week_start"].as_str().map(|s| s.to_string()))
        .collect();
    let id = stable_id(&["weekly-sales", &ctx.merchant_id, &labels.join("|")]);

    let line_data: Vec<Value> = weeks
        .iter()
        .map(|w| json!({"name": w["week_start"], "value": w["total"]}))
        .collect();

    ToolResult::success()
        .with_field("weeks", json!(weeks))
        .with_field("peak_hour", json!(peak_label))
        .with_id(id.clone())
        .with_client_action(ClientAction::new(
            ClientAction::ADD_DATA_WINDOW,
            json!({
                "visualization_type": "graph",
                "title": "Weekly Sales",
                "id": id,
                "data": {
                    "lineData": line_data,
                    "statData": [{"label": "Peak ordering hour", "value": peak_label}],
                    "merchant": ctx.merchant_name,
                },
            }),
        ))
}

/// Index of the anchored 7-day window containing the order.
fn week_bucket(order: &OrderRow) -> i64 {
    let days = (order.order_time.date_naive() - WEEK_ANCHOR).num_days();
    days.div_euclid(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryData;
    use chrono::NaiveDateTime;

    fn order(id: &str, time: &str, value: f64) -> OrderRow {
        OrderRow {
            order_id: id.to_string(),
            order_time: NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S")
                .unwrap()
                .and_utc(),
            order_value: value,
        }
    }

    fn ctx() -> MerchantContext {
        MerchantContext::new("m1", "Fried Chicken Express")
    }

    fn recent(days_ago: i64, hour: u32) -> String {
        (Utc::now() - Duration::days(days_ago))
            .date_naive()
            .format("%Y-%m-%d")
            .to_string()
            + &format!(" {:02}:00:00", hour)
    }

    #[tokio::test]
    async fn empty_window_is_success_not_error() {
        let data = MemoryData::default();
        let result =
            top_selling_items(&data, &json!({"time_period": "week"}), &ctx()).await;
        assert!(result.success);
        assert_eq!(result.data["items"], json!([]));
        assert!(result.client_action.is_none());
    }

    #[tokio::test]
    async fn top_items_ranked_by_count_with_names() {
        let mut data = MemoryData::default();
        data.orders = vec![
            order("o1", &recent(1, 12), 10.0),
            order("o2", &recent(2, 13), 20.0),
            order("o3", &recent(3, 14), 30.0),
        ];
        data.sales = vec![
            ("o1", 101),
            ("o1", 102),
            ("o2", 101),
            ("o3", 101),
            ("o3", 103),
        ]
        .into_iter()
        .map(|(o, i)| (o.to_string(), i))
        .collect();
        data.catalogue = vec![
            (101, "Chicken Wings", Some("Western")),
            (102, "Fries", Some("Western")),
            (103, "Burger", Some("Western")),
        ]
        .into_iter()
        .map(|(id, name, tag)| (id, name.to_string(), tag.map(|t| t.to_string())))
        .collect();

        let result =
            top_selling_items(&data, &json!({"time_period": "week"}), &ctx()).await;
        assert!(result.success);
        let items = result.data["items"].as_array().unwrap();
        assert_eq!(items[0]["name"], "Chicken Wings");
        assert_eq!(items[0]["count"], 3);
        // 102 and 103 both sold once; the smaller item id ranks first.
        assert_eq!(items[1]["name"], "Fries");
        let action = result.client_action.unwrap();
        assert_eq!(action.kind, ClientAction::ADD_DATA_WINDOW);
        assert_eq!(action.params["visualization_type"], "chart");
        assert!(result.id.is_some());
    }

    #[tokio::test]
    async fn missing_time_period_is_a_typed_failure() {
        let data = MemoryData::default();
        let result = top_selling_items(&data, &json!({}), &ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("time_period"));
    }

    #[tokio::test]
    async fn best_day_ties_resolve_to_earliest_date() {
        let mut data = MemoryData::default();
        data.orders = vec![
            order("o1", &recent(5, 10), 50.0),
            order("o2", &recent(2, 11), 50.0),
        ];
        let result = best_selling_day(&data, &ctx()).await;
        assert!(result.success);
        let earlier = (Utc::now() - Duration::days(5))
            .date_naive()
            .format("%Y-%m-%d")
            .to_string();
        assert_eq!(result.data["best_day"], json!(earlier));
    }

    #[tokio::test]
    async fn best_day_with_no_orders_returns_null() {
        let data = MemoryData::default();
        let result = best_selling_day(&data, &ctx()).await;
        assert!(result.success);
        assert_eq!(result.data["best_day"], Value::Null);
        assert!(result.client_action.is_none());
    }

    #[tokio::test]
    async fn weekly_sales_buckets_follow_the_anchor() {
        let mut data = MemoryData::default();
        // Two orders in the same anchored week, one in the next.
        data.orders = vec![
            order("o1", &recent(10, 9), 10.0),
            order("o2", &recent(10, 20), 15.0),
            order("o3", &recent(3, 20), 99.0),
        ];
        let result = weekly_sales(&data, &ctx()).await;
        assert!(result.success);
        let weeks = result.data["weeks"].as_array().unwrap();
        assert!(weeks.len() <= 3);
        let total: f64 = weeks.iter().map(|w| w["total"].as_f64().unwrap()).sum();
        assert!((total - 124.0).abs() < 1e-6);
        // Peak hour is the 20:00 slot (two orders).
        assert_eq!(result.data["peak_hour"], "20:00");
    }

    #[tokio::test]
    async fn datastore_failure_becomes_failure_result() {
        let data = MemoryData::failing("connection refused");
        let result = best_selling_day(&data, &ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("connection refused"));
    }
}
