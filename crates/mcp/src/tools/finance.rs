// Stock quotes, currency conversion and market overviews over SerpAPI's
// Google Finance engine

use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wayfarer_core::filter::MovementFilter;
use wayfarer_core::payload::FinancePayload;
use wayfarer_core::{
    Namespace, SearchId, SearchIdBuilder, SearchMetadata, SearchRecord, SearchResult,
};

use super::{
    build_payload, json_schema_number, json_schema_object, json_schema_string, parse_args,
    respond, FilterSpec, FilterTool, GetDetailsTool, ListSearchesTool, SearchDetailTool, Tool,
    ToolContext, ToolRegistry,
};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::providers::ProviderRequest;

/// Ticker used to pull the market overview panels
const OVERVIEW_TICKER: &str = "GOOGL:NASDAQ";

/// Regions shown by `get_market_overview` with how many quotes each
const OVERVIEW_REGIONS: [(&str, &str, usize); 6] = [
    ("us", "us_markets", 5),
    ("europe", "european_markets", 5),
    ("asia", "asian_markets", 5),
    ("currencies", "major_currencies", 10),
    ("crypto", "cryptocurrencies", 10),
    ("futures", "futures", 5),
];

pub fn register(registry: &mut ToolRegistry, ctx: &ToolContext) {
    registry.register(Arc::new(LookupStockTool::new(ctx.clone())));
    registry.register(Arc::new(ConvertCurrencyTool::new(ctx.clone())));
    registry.register(Arc::new(MarketOverviewTool::new(ctx.clone())));
    registry.register(Arc::new(HistoricalDataTool::new(ctx.clone())));
    registry.register(Arc::new(GetDetailsTool::new(
        "get_finance_details",
        Namespace::Finance,
        ctx.store.clone(),
    )));
    registry.register(Arc::new(FilterTool::<MovementFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(ListSearchesTool::new(
        "list_finance_searches",
        Namespace::Finance,
        ctx.catalog.clone(),
    )));
    registry.register(Arc::new(SearchDetailTool::new(
        "get_finance_search_detail",
        Namespace::Finance,
        ctx.catalog.clone(),
    )));
}

fn en() -> String {
    "en".to_string()
}

fn unit_amount() -> f64 {
    1.0
}

fn one_year() -> String {
    "1Y".to_string()
}

/// `SYMBOL` or `SYMBOL:EXCHANGE`, upper-cased
fn ticker(symbol: &str, exchange: Option<&str>) -> String {
    match exchange {
        Some(exchange) => format!("{}:{}", symbol.to_uppercase(), exchange.to_uppercase()),
        None => symbol.to_uppercase(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Fetch a Google Finance page and keep the selected top-level fields
async fn fetch_fields(
    ctx: &ToolContext,
    request: ProviderRequest,
    keys: &[&str],
) -> SearchResult<Map<String, Value>> {
    let body = ctx.providers.serpapi.fetch(request.param("engine", "google_finance")).await?;
    Ok(keys
        .iter()
        .filter_map(|key| body.get(*key).map(|value| ((*key).to_string(), value.clone())))
        .collect())
}

async fn store(
    ctx: &ToolContext,
    metadata: SearchMetadata,
    fields: Map<String, Value>,
) -> SearchResult<SearchRecord<FinancePayload>> {
    let payload: FinancePayload = build_payload("serpapi", fields)?;
    let record = SearchRecord::new(metadata, payload);
    ctx.store.put(&record).await?;
    Ok(record)
}

fn schema(name: &str, description: &str, properties: Value, required: Vec<&str>) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json_schema_object(properties, required),
    }
}

#[derive(Debug, Deserialize)]
struct LookupStockArgs {
    symbol: String,
    #[serde(default)]
    exchange: Option<String>,
    /// 1D, 5D, 1M, 6M, YTD, 1Y, 5Y or MAX
    #[serde(default)]
    window: Option<String>,
    #[serde(default = "en")]
    language: String,
}

pub struct LookupStockTool {
    ctx: ToolContext,
}

impl LookupStockTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn lookup(&self, args: LookupStockArgs) -> SearchResult<Value> {
        let exchange = non_empty(&args.exchange);
        let window = non_empty(&args.window).map(str::to_uppercase);
        let query = ticker(&args.symbol, exchange);

        let request = ProviderRequest::new("search")
            .param("q", &query)
            .param("hl", &args.language)
            .optional("window", window.as_deref());

        let search_id = SearchIdBuilder::new()
            .part("stock")
            .part(&args.symbol)
            .optional(exchange)
            .build();
        let metadata = SearchMetadata::new(search_id.clone())
            .with_type("stock")
            .param("symbol", args.symbol.to_uppercase())
            .param("exchange", exchange)
            .param("query", query.as_str())
            .param("window", window.clone());

        let fields = fetch_fields(
            &self.ctx,
            request,
            &[
                "summary",
                "graph",
                "knowledge_graph",
                "news_results",
                "financials",
                "key_events",
                "discover_more",
            ],
        )
        .await?;
        let record = store(&self.ctx, metadata, fields).await?;

        let summary = record.payload.summary.as_ref();
        Ok(json!({
            "search_id": search_id,
            "symbol": args.symbol.to_uppercase(),
            "company_name": summary.and_then(|s| s.title.as_deref()).unwrap_or("N/A"),
            "exchange": summary
                .and_then(|s| s.exchange.as_deref())
                .or(exchange)
                .unwrap_or("N/A"),
            "current_price": summary.and_then(|s| s.extracted_price()).unwrap_or(0.0),
            "currency": summary.and_then(|s| s.currency.as_deref()).unwrap_or("USD"),
            "price_movement": summary.and_then(|s| s.price_movement.as_ref()),
            "market_status": summary.and_then(|s| s.extra.get("market")),
            "last_updated": Utc::now().to_rfc3339()
        }))
    }
}

#[async_trait::async_trait]
impl Tool for LookupStockTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "lookup_stock",
            "Look up a stock's price, news and key events with Google Finance and store the results",
            json!({
                "symbol": json_schema_string("Stock symbol, e.g. 'GOOGL'"),
                "exchange": json_schema_string("Exchange, e.g. 'NASDAQ'"),
                "window": json_schema_string("Graph window: 1D, 5D, 1M, 6M, YTD, 1Y, 5Y or MAX"),
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec!["symbol"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<LookupStockArgs>(arguments) {
            Ok(args) => self.lookup(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct ConvertCurrencyArgs {
    from_currency: String,
    to_currency: String,
    #[serde(default = "unit_amount")]
    amount: f64,
    #[serde(default = "en")]
    language: String,
}

pub struct ConvertCurrencyTool {
    ctx: ToolContext,
}

/// Rate from the page summary, falling back to the matching currency quote
fn exchange_rate(payload: &FinancePayload, pair: &str) -> f64 {
    payload
        .summary
        .as_ref()
        .and_then(|s| s.extracted_price())
        .filter(|rate| *rate != 0.0)
        .or_else(|| {
            payload
                .quotes_in("currencies")
                .iter()
                .find(|quote| quote.stock.as_deref() == Some(pair))
                .and_then(|quote| quote.price())
        })
        .unwrap_or(0.0)
}

impl ConvertCurrencyTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn convert(&self, args: ConvertCurrencyArgs) -> SearchResult<Value> {
        let from = args.from_currency.to_uppercase();
        let to = args.to_currency.to_uppercase();
        let pair = format!("{}-{}", from, to);

        let request = ProviderRequest::new("search")
            .param("q", &pair)
            .param("hl", &args.language);
        let search_id = SearchIdBuilder::new()
            .part("currency")
            .part(&from)
            .part(&to)
            .build();
        let metadata = SearchMetadata::new(search_id.clone())
            .with_type("currency")
            .param("from_currency", from.as_str())
            .param("to_currency", to.as_str())
            .param("amount", args.amount)
            .param("query", pair.as_str());

        let fields = fetch_fields(&self.ctx, request, &["summary", "graph", "markets"]).await?;
        let record = store(&self.ctx, metadata, fields).await?;

        let rate = exchange_rate(&record.payload, &pair);
        Ok(json!({
            "search_id": search_id,
            "from_currency": from,
            "to_currency": to,
            "original_amount": args.amount,
            "exchange_rate": rate,
            "converted_amount": args.amount * rate,
            "rate_change": record.payload.summary.as_ref().and_then(|s| s.price_movement.as_ref()),
            "last_updated": Utc::now().to_rfc3339()
        }))
    }
}

#[async_trait::async_trait]
impl Tool for ConvertCurrencyTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "convert_currency",
            "Convert an amount between currencies at Google Finance's rate and store the quote",
            json!({
                "from_currency": json_schema_string("Source currency code, e.g. 'USD'"),
                "to_currency": json_schema_string("Target currency code, e.g. 'EUR'"),
                "amount": json_schema_number("Amount to convert (default 1.0)"),
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec!["from_currency", "to_currency"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<ConvertCurrencyArgs>(arguments) {
            Ok(args) => self.convert(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct MarketOverviewArgs {
    #[serde(default = "en")]
    language: String,
}

pub struct MarketOverviewTool {
    ctx: ToolContext,
}

impl MarketOverviewTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn overview(&self, args: MarketOverviewArgs) -> SearchResult<Value> {
        let request = ProviderRequest::new("search")
            .param("q", OVERVIEW_TICKER)
            .param("hl", &args.language);
        let search_id = SearchIdBuilder::new().part("market_overview").build();
        let metadata = SearchMetadata::new(search_id.clone()).with_type("market_overview");

        let fields = fetch_fields(&self.ctx, request, &["markets"]).await?;
        let record = store(&self.ctx, metadata, fields).await?;

        let mut summary = Map::new();
        summary.insert("search_id".into(), json!(search_id));
        for (region, label, top) in OVERVIEW_REGIONS {
            let quotes: Vec<_> = record.payload.quotes_in(region).iter().take(top).collect();
            summary.insert(label.into(), json!(quotes));
        }
        summary.insert("last_updated".into(), json!(Utc::now().to_rfc3339()));
        Ok(Value::Object(summary))
    }
}

#[async_trait::async_trait]
impl Tool for MarketOverviewTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_market_overview",
            "Snapshot of major indices, currencies, crypto and futures from Google Finance",
            json!({
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec![],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<MarketOverviewArgs>(arguments) {
            Ok(args) => self.overview(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalDataArgs {
    symbol: String,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default = "one_year")]
    window: String,
    #[serde(default = "en")]
    language: String,
}

pub struct HistoricalDataTool {
    ctx: ToolContext,
}

/// Min, max, mean and spread of the graph prices; empty when there are none
fn price_statistics(prices: &[f64]) -> Value {
    if prices.is_empty() {
        return json!({});
    }
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = prices.iter().sum::<f64>() / prices.len() as f64;
    json!({
        "min_price": min,
        "max_price": max,
        "avg_price": avg,
        "price_range": max - min,
        "total_data_points": prices.len()
    })
}

impl HistoricalDataTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn history(&self, args: HistoricalDataArgs) -> SearchResult<Value> {
        let exchange = non_empty(&args.exchange);
        let window = args.window.to_uppercase();
        let query = ticker(&args.symbol, exchange);

        let request = ProviderRequest::new("search")
            .param("q", &query)
            .param("window", &window)
            .param("hl", &args.language);
        let search_id: SearchId = SearchIdBuilder::new()
            .part("historical")
            .part(&args.symbol)
            .optional(exchange)
            .part(&window)
            .build();
        let metadata = SearchMetadata::new(search_id.clone())
            .with_type("historical")
            .param("symbol", args.symbol.to_uppercase())
            .param("exchange", exchange)
            .param("window", window.as_str());

        let mut fields = fetch_fields(&self.ctx, request, &["summary", "graph", "key_events"]).await?;
        let data_points = fields
            .get("graph")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        fields.insert("data_points".into(), json!(data_points));
        let record = store(&self.ctx, metadata, fields).await?;

        let key_events = record.payload.key_events.as_ref().map_or(0, Vec::len);
        Ok(json!({
            "search_id": search_id,
            "symbol": args.symbol.to_uppercase(),
            "window": window,
            "statistics": price_statistics(&record.payload.graph_prices()),
            "key_events_count": key_events,
            "has_data": data_points > 0,
            "last_updated": Utc::now().to_rfc3339()
        }))
    }
}

#[async_trait::async_trait]
impl Tool for HistoricalDataTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_historical_data",
            "Fetch a stock's price history for a time window and store it",
            json!({
                "symbol": json_schema_string("Stock symbol, e.g. 'AAPL'"),
                "exchange": json_schema_string("Exchange, e.g. 'NASDAQ'"),
                "window": json_schema_string("1D, 5D, 1M, 6M, YTD, 1Y (default), 5Y or MAX"),
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec!["symbol"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<HistoricalDataArgs>(arguments) {
            Ok(args) => self.history(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

impl FilterSpec for MovementFilter {
    const NAME: &'static str = "filter_stocks_by_price_movement";
    const DESCRIPTION: &'static str =
        "Filter the market quotes of a stored finance search by absolute percentage move and direction";

    fn properties() -> Value {
        json!({
            "min_percentage": json_schema_number("Minimum absolute change in percent"),
            "max_percentage": json_schema_number("Maximum absolute change in percent"),
            "movement_type": json_schema_string("'Up' or 'Down'")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::StubProvider;
    use crate::tools::testing::{context, json_of};

    #[tokio::test]
    async fn test_lookup_stock() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "summary": {
                "title": "Alphabet Inc Class A",
                "exchange": "NASDAQ",
                "extracted_price": 175.5,
                "currency": "USD",
                "market": {"trading": "Closed"}
            },
            "news_results": [{"title": "Earnings beat"}],
            "ads": ["dropped"]
        })));
        let ctx = context(&stub);
        let tool = LookupStockTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({"symbol": "googl", "exchange": "nasdaq", "window": "5d"}))
                .await
                .unwrap(),
        );
        let search_id = summary["search_id"].as_str().unwrap().to_string();
        assert!(search_id.starts_with("stock_googl_nasdaq_"));
        assert_eq!(summary["symbol"], "GOOGL");
        assert_eq!(summary["company_name"], "Alphabet Inc Class A");
        assert_eq!(summary["current_price"], 175.5);
        assert_eq!(summary["market_status"]["trading"], "Closed");

        let request = &stub.requests()[0];
        assert_eq!(request.get("engine"), Some("google_finance"));
        assert_eq!(request.get("q"), Some("GOOGL:NASDAQ"));
        assert_eq!(request.get("window"), Some("5D"));

        let record = ctx
            .store
            .get::<FinancePayload>(&SearchId::new(search_id))
            .await
            .unwrap();
        assert_eq!(record.metadata.search_type.as_deref(), Some("stock"));
        assert!(record.payload.extra.get("ads").is_none());
        assert_eq!(record.payload.news_results.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_convert_currency_falls_back_to_market_quote() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "summary": {"title": "USD to EUR"},
            "markets": {
                "currencies": [
                    {"stock": "GBP-EUR", "price": 1.17},
                    {"stock": "USD-EUR", "price": 0.9}
                ]
            }
        })));
        let tool = ConvertCurrencyTool::new(context(&stub));

        let summary = json_of(
            &tool
                .execute(json!({"from_currency": "usd", "to_currency": "eur", "amount": 100.0}))
                .await
                .unwrap(),
        );
        assert!(summary["search_id"]
            .as_str()
            .unwrap()
            .starts_with("currency_usd_eur_"));
        assert_eq!(summary["exchange_rate"], 0.9);
        assert_eq!(summary["converted_amount"], 90.0);
        assert_eq!(stub.requests()[0].get("q"), Some("USD-EUR"));
    }

    #[tokio::test]
    async fn test_market_overview_truncates_regions() {
        let stub = StubProvider::new();
        let us: Vec<Value> = (0..8).map(|i| json!({"stock": format!("IDX{}", i)})).collect();
        stub.respond(Ok(json!({"markets": {"us": us, "top_news": {"title": "x"}}})));
        let ctx = context(&stub);
        let tool = MarketOverviewTool::new(ctx.clone());

        let summary = json_of(&tool.execute(Value::Null).await.unwrap());
        assert!(summary["search_id"]
            .as_str()
            .unwrap()
            .starts_with("market_overview_"));
        assert_eq!(summary["us_markets"].as_array().unwrap().len(), 5);
        assert_eq!(summary["cryptocurrencies"], json!([]));
        assert_eq!(stub.requests()[0].get("q"), Some(OVERVIEW_TICKER));

        let stored = ctx.store.list(Namespace::Finance).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1.search_type.as_deref(), Some("market_overview"));
    }

    #[tokio::test]
    async fn test_historical_statistics() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "graph": [{"price": 100.0}, {"price": 120.0}, {"price": 110.0}],
            "key_events": [{"title": "Split"}]
        })));
        let ctx = context(&stub);
        let tool = HistoricalDataTool::new(ctx.clone());

        let summary = json_of(&tool.execute(json!({"symbol": "AAPL"})).await.unwrap());
        let search_id = summary["search_id"].as_str().unwrap().to_string();
        assert!(search_id.starts_with("historical_aapl_1y_"));
        assert_eq!(summary["window"], "1Y");
        assert_eq!(summary["statistics"]["min_price"], 100.0);
        assert_eq!(summary["statistics"]["max_price"], 120.0);
        assert_eq!(summary["statistics"]["avg_price"], 110.0);
        assert_eq!(summary["statistics"]["price_range"], 20.0);
        assert_eq!(summary["key_events_count"], 1);
        assert_eq!(summary["has_data"], true);
        assert_eq!(stub.requests()[0].get("window"), Some("1Y"));

        let record = ctx
            .store
            .get::<FinancePayload>(&SearchId::new(search_id))
            .await
            .unwrap();
        assert_eq!(record.payload.extra["data_points"], 3);
    }

    #[test]
    fn test_price_statistics_empty() {
        assert_eq!(price_statistics(&[]), json!({}));
    }
}
