use mcp_toolhub::{
    build_app,
    config::Config,
    logging, AppState, HandlerError, ParamSpec, ParamType, PromptBuilder, PromptMessage,
    PromptReturn, Registry, RegistryError, ResourceBuilder, ToolBuilder,
};
use serde_json::{json, Map, Value};
use tracing::info;

fn number_arg(args: &Map<String, Value>, name: &str) -> Result<f64, HandlerError> {
    args.get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| HandlerError::new(format!("argument {name} must be a number")))
}

fn calculator_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();

    registry.register_tool(
        ToolBuilder::new("add")
            .description("Add two numbers together.")
            .param(ParamSpec::required("a", ParamType::Number))
            .param(ParamSpec::required("b", ParamType::Number))
            .handler(|args, _ctx| {
                Ok(json!(number_arg(args, "a")? + number_arg(args, "b")?).into())
            }),
    )?;

    registry.register_tool(
        ToolBuilder::new("power")
            .description("Raise base to the given exponent.")
            .param(ParamSpec::required("base", ParamType::Number))
            .param(ParamSpec::optional("exponent", ParamType::Number, json!(2.0)))
            .tag("math")
            .tag("advanced")
            .wants_context()
            .handler(|args, ctx| {
                let base = number_arg(args, "base")?;
                let exponent = number_arg(args, "exponent")?;
                if let Some(ctx) = ctx {
                    ctx.info(&format!("computing {base}^{exponent}"));
                }
                Ok(json!(base.powf(exponent)).into())
            }),
    )?;

    registry.register_tool(
        ToolBuilder::new("subtract")
            .description("Subtract b from a.")
            .param(ParamSpec::required("a", ParamType::Number))
            .param(ParamSpec::required("b", ParamType::Number))
            .handler(|args, _ctx| {
                Ok(json!(number_arg(args, "a")? - number_arg(args, "b")?).into())
            }),
    )?;

    registry.register_tool(
        ToolBuilder::new("multiply")
            .description("Multiply two numbers.")
            .param(ParamSpec::required("a", ParamType::Number))
            .param(ParamSpec::required("b", ParamType::Number))
            .handler(|args, _ctx| {
                Ok(json!(number_arg(args, "a")? * number_arg(args, "b")?).into())
            }),
    )?;

    registry.register_tool(
        ToolBuilder::new("divide")
            .description("Divide a by b.")
            .param(ParamSpec::required("a", ParamType::Number))
            .param(ParamSpec::required("b", ParamType::Number))
            .handler(|args, _ctx| {
                let a = number_arg(args, "a")?;
                let b = number_arg(args, "b")?;
                if b == 0.0 {
                    return Err(HandlerError::new("Cannot divide by zero"));
                }
                Ok(json!(a / b).into())
            }),
    )?;

    registry.register_resource(
        ResourceBuilder::new("config://calculator/settings", "Calculator Settings")
            .description("Get calculator settings.")
            .mime_type("application/json")
            .handler(|_ctx| {
                Ok(json!({
                    "precision": 10,
                    "max_value": 1e308,
                    "supported_operations": ["add", "power", "subtract", "multiply", "divide"]
                })
                .into())
            }),
    )?;

    registry.register_prompt(
        PromptBuilder::new("calculate")
            .description("Generate a calculation prompt.")
            .param(ParamSpec::required("expression", ParamType::String))
            .handler(|args, _ctx| {
                let expression = args
                    .get("expression")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(PromptReturn::Messages(vec![PromptMessage::user(format!(
                    "Please calculate: {expression}"
                ))]))
            }),
    )?;

    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let registry = calculator_registry()?;
    let mut state = AppState::new("simple-calculator", "1.0.0", registry);
    if let Some(prefix) = &config.path_prefix {
        state = state.with_path_prefix(prefix.clone());
    }

    info!(
        tools = state.registry.tools().len(),
        resources = state.registry.resources().len(),
        prompts = state.registry.prompts().len(),
        "capabilities registered"
    );

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
