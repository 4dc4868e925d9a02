use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sol::binding::bind_json;
use sol::logging::{init_logging, LogConfig};
use sol::validator::{Field, Validate};
use sol::{handlers, App, Context};
use tracing::info;

#[derive(Debug, Deserialize, Serialize)]
struct NewUser {
    name: String,
    email: String,
    age: Option<u32>,
}

impl Validate for NewUser {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("name", &self.name, "required,min=2,max=32"),
            Field::new("email", &self.email, "required,email"),
            Field::new("age", self.age, "gte=13,lt=150"),
        ]
    }
}

fn create_user(c: &mut Context) {
    let user: NewUser = match bind_json(c) {
        Ok(user) => user,
        Err(err) => {
            c.json(StatusCode::BAD_REQUEST, &json!({ "error": err.to_string() }));
            return;
        }
    };
    if let Err(errors) = user.validate() {
        c.json(StatusCode::UNPROCESSABLE_ENTITY, &errors);
        return;
    }
    info!(name = %user.name, "User created");
    c.json(StatusCode::CREATED, &user);
}

fn require_token(c: &mut Context) {
    if c.header("authorization").is_none() {
        c.json(StatusCode::UNAUTHORIZED, &json!({ "error": "missing token" }));
        c.abort();
        return;
    }
    c.set("authenticated", true);
    c.next();
}

fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;

    let mut app = App::new().with_logger();

    app.get(
        "/",
        handlers![|c: &mut Context| c.string(StatusCode::OK, "sol is running\n")],
    );
    app.get(
        "/hello/:name",
        handlers![|c: &mut Context| {
            let name = c.param("name").unwrap_or("stranger").to_string();
            c.json(StatusCode::OK, &json!({ "hello": name }));
        }],
    );

    {
        let mut api = app.group("/api", handlers![]);
        api.get(
            "/ping",
            handlers![|c: &mut Context| c.json(StatusCode::OK, &json!({ "pong": true }))],
        );
        let mut users = api.group("/users", handlers![require_token]);
        users.post("/", handlers![create_user]);
        users.get(
            "/:id",
            handlers![|c: &mut Context| {
                let id = c.param("id").unwrap_or_default().to_string();
                c.json(StatusCode::OK, &json!({ "id": id }));
            }],
        );
    }

    app.run(None)?;
    Ok(())
}
