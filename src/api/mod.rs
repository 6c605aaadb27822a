mod error;

use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRequest, Json, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::core::{
    Document, Entry, FixedAmounts, Investment, NewEntry, NewInvestment, add_expense, add_income,
    add_investment, normalize_entry_name, normalize_investment_name, remove_expense,
    remove_income, remove_investment, replace_expenses, update_expense, update_fixed,
};
use crate::store::JsonStore;

pub use error::{ApiError, ApiResult};

const PAGES: [(&str, &str); 5] = [
    ("/", "index.html"),
    ("/ganhos", "ganhos.html"),
    ("/gastos", "gastos.html"),
    ("/investimentos", "investimentos.html"),
    ("/saldo", "saldo.html"),
];

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
}

impl AppState {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

/// `Json` extractor whose rejections come back in the API error shape.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct ApiJson<T>(T);

#[derive(Serialize)]
struct SuccessResponse<T> {
    status: &'static str,
    dados: T,
}

/// Body shared by every income/expense endpoint; each one picks the fields it needs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntryPayload {
    #[serde(rename = "nome")]
    name: Option<String>,
    #[serde(rename = "valor")]
    amount: Option<f64>,
    #[serde(rename = "data")]
    date: Option<String>,
}

impl EntryPayload {
    fn normalized_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(normalize_entry_name)
            .filter(|name| !name.is_empty())
    }

    fn into_new_entry(self, today: impl FnOnce() -> String) -> ApiResult<NewEntry> {
        let (Some(name), Some(amount)) = (self.normalized_name(), self.amount) else {
            return Err(ApiError::missing_fields());
        };
        require_finite(&[amount])?;
        Ok(NewEntry {
            name,
            amount,
            date: date_or_today(self.date, today),
        })
    }

    fn into_removal_key(self) -> ApiResult<(String, String)> {
        let name = self.normalized_name();
        match (name, self.date.filter(|date| !date.is_empty())) {
            (Some(name), Some(date)) => Ok((name, date)),
            _ => Err(ApiError::BadRequest(
                "Nome e data são obrigatórios".to_string(),
            )),
        }
    }

    fn into_amount_update(self) -> ApiResult<(String, f64)> {
        match (self.normalized_name(), self.amount) {
            (Some(name), Some(amount)) => {
                require_finite(&[amount])?;
                Ok((name, amount))
            }
            _ => Err(ApiError::missing_fields()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InvestmentPayload {
    #[serde(rename = "nome")]
    name: Option<String>,
    #[serde(rename = "tipo")]
    kind: Option<String>,
    #[serde(rename = "quantidade")]
    quantity: Option<f64>,
    #[serde(rename = "valor")]
    amount: Option<f64>,
    #[serde(rename = "data")]
    date: Option<String>,
}

impl InvestmentPayload {
    fn key(&self) -> (Option<String>, Option<String>) {
        let name = self
            .name
            .as_deref()
            .map(normalize_investment_name)
            .filter(|name| !name.is_empty());
        let kind = self.kind.clone().filter(|kind| !kind.is_empty());
        (name, kind)
    }

    fn into_new_investment(self, today: impl FnOnce() -> String) -> ApiResult<NewInvestment> {
        let (Some(name), Some(kind)) = self.key() else {
            return Err(ApiError::missing_fields());
        };
        let (Some(quantity), Some(amount)) = (self.quantity, self.amount) else {
            return Err(ApiError::missing_fields());
        };
        require_finite(&[quantity, amount])?;
        Ok(NewInvestment {
            name,
            kind,
            quantity,
            amount,
            date: date_or_today(self.date, today),
        })
    }

    fn into_removal_key(self) -> ApiResult<(String, String)> {
        match self.key() {
            (Some(name), Some(kind)) => Ok((name, kind)),
            _ => Err(ApiError::BadRequest(
                "Nome e tipo são obrigatórios".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplaceExpensesPayload {
    dados: Option<Value>,
}

impl ReplaceExpensesPayload {
    fn into_expenses(self) -> ApiResult<Vec<Entry>> {
        match self.dados {
            Some(items @ Value::Array(_)) => {
                let expenses: Vec<Entry> = serde_json::from_value(items)
                    .map_err(|e| ApiError::BadRequest(format!("Itens de dados inválidos: {e}")))?;
                if !expenses.iter().all(|expense| expense.amount.is_finite()) {
                    return Err(ApiError::non_finite());
                }
                Ok(expenses)
            }
            _ => Err(ApiError::BadRequest(
                "O campo dados deve ser uma lista".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FixedPayload {
    #[serde(rename = "ganhos")]
    income_total: Option<f64>,
    #[serde(rename = "gastos")]
    expense_total: Option<f64>,
}

impl FixedPayload {
    fn into_fixed(self) -> ApiResult<FixedAmounts> {
        match (self.income_total, self.expense_total) {
            (Some(income_total), Some(expense_total)) => {
                require_finite(&[income_total, expense_total])?;
                Ok(FixedAmounts {
                    income_total,
                    expense_total,
                })
            }
            _ => Err(ApiError::missing_fields()),
        }
    }
}

fn require_finite(values: &[f64]) -> ApiResult<()> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(ApiError::non_finite())
    }
}

fn date_or_today(date: Option<String>, today: impl FnOnce() -> String) -> String {
    date.filter(|date| !date.is_empty()).unwrap_or_else(today)
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn app_router(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/api/dados", get(document_handler))
        .route("/api/adicionar_ganho", post(add_income_handler))
        .route("/api/remover_ganho", post(remove_income_handler))
        .route("/api/adicionar_investimento", post(add_investment_handler))
        .route("/api/remover_investimento", post(remove_investment_handler))
        .route("/api/adicionar_gasto", post(add_expense_handler))
        .route("/api/atualizar_gasto", post(update_expense_handler))
        .route("/api/remover_gasto", post(remove_expense_handler))
        .route("/api/atualizar_gastos", post(replace_expenses_handler))
        .route("/api/atualizar_fixos", post(update_fixed_handler))
        .with_state(state);

    let pages = PAGES
        .iter()
        .fold(Router::new(), |router, (path, file)| {
            router.route_service(path, ServeFile::new(config.templates_dir.join(file)))
        })
        .nest_service("/static", ServeDir::new(&config.static_dir));

    api.merge(pages)
        .fallback(not_found_handler)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }
    let origins = config
        .cors_allow
        .iter()
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub async fn run_http_server(config: Config) -> std::io::Result<()> {
    let store = JsonStore::new(&config.data_file);
    tracing::info!(path = %store.path().display(), "using data file");
    let app = app_router(AppState::new(store), &config);

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Finance API listening on http://{}", config.listen_addr);

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    ApiError::NotFound("Não encontrado".to_string()).into_response()
}

async fn document_handler(State(state): State<AppState>) -> ApiResult<Response> {
    let document: Document = state.store.read().await?;
    Ok(json_response(StatusCode::OK, document))
}

async fn add_income_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EntryPayload>,
) -> ApiResult<Response> {
    let new = payload.into_new_entry(today)?;
    let incomes = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(add_income(doc, new).to_vec()) })
        .await?;
    tracing::info!(count = incomes.len(), "income added");
    Ok(success(incomes))
}

async fn remove_income_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EntryPayload>,
) -> ApiResult<Response> {
    let (name, date) = payload.into_removal_key()?;
    let incomes = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(remove_income(doc, &name, &date).to_vec()) })
        .await?;
    tracing::info!(%name, %date, remaining = incomes.len(), "income removed");
    Ok(success(incomes))
}

async fn add_investment_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<InvestmentPayload>,
) -> ApiResult<Response> {
    let new = payload.into_new_investment(today)?;
    let investments = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(add_investment(doc, new)?.to_vec()) })
        .await?;
    tracing::info!(count = investments.len(), "investment recorded");
    Ok(success(investments))
}

async fn remove_investment_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<InvestmentPayload>,
) -> ApiResult<Response> {
    let (name, kind) = payload.into_removal_key()?;
    let investments: Vec<Investment> = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(remove_investment(doc, &name, &kind).to_vec()) })
        .await?;
    tracing::info!(%name, %kind, remaining = investments.len(), "investment removed");
    Ok(success(investments))
}

async fn add_expense_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EntryPayload>,
) -> ApiResult<Response> {
    let new = payload.into_new_entry(today)?;
    let expenses = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(add_expense(doc, new).to_vec()) })
        .await?;
    tracing::info!(count = expenses.len(), "expense added");
    Ok(success(expenses))
}

async fn update_expense_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EntryPayload>,
) -> ApiResult<Response> {
    let (name, amount) = payload.into_amount_update()?;
    let expenses = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(update_expense(doc, &name, amount)?.to_vec()) })
        .await?;
    tracing::info!(%name, amount, "expense updated");
    Ok(success(expenses))
}

async fn remove_expense_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EntryPayload>,
) -> ApiResult<Response> {
    let (name, date) = payload.into_removal_key()?;
    let expenses = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(remove_expense(doc, &name, &date).to_vec()) })
        .await?;
    tracing::info!(%name, %date, remaining = expenses.len(), "expense removed");
    Ok(success(expenses))
}

async fn replace_expenses_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ReplaceExpensesPayload>,
) -> ApiResult<Response> {
    let replacement = payload.into_expenses()?;
    let expenses = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(replace_expenses(doc, replacement).to_vec()) })
        .await?;
    tracing::info!(count = expenses.len(), "expenses replaced");
    Ok(success(expenses))
}

async fn update_fixed_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<FixedPayload>,
) -> ApiResult<Response> {
    let fixed = payload.into_fixed()?;
    let fixed = state
        .store
        .update(|doc| -> ApiResult<_> { Ok(update_fixed(doc, fixed)) })
        .await?;
    tracing::info!(
        income_total = fixed.income_total,
        expense_total = fixed.expense_total,
        "fixed amounts updated"
    );
    Ok(success(fixed))
}

fn success<T: Serialize>(dados: T) -> Response {
    json_response(
        StatusCode::OK,
        SuccessResponse {
            status: "sucesso",
            dados,
        },
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
