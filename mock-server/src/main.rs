use mock_server::{Obito, Registry, SERVICE_PATH};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let username = std::env::var("MOCK_USERNAME").unwrap_or_else(|_| "demo".to_string());
    let password = std::env::var("MOCK_PASSWORD").unwrap_or_else(|_| "demo".to_string());

    let mut registry = Registry::new(&username, &password)
        .with_obito("2018-06-04", demo(1, "Maria Aparecida dos Santos", "000001"))
        .with_obito("2018-06-04", demo(2, "João Batista Pereira", "000002"));
    registry.legacy_latin1 = std::env::var("MOCK_LEGACY_LATIN1").is_ok_and(|v| v == "1");

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on http://{addr}{SERVICE_PATH}");
    mock_server::run(listener, registry).await
}

fn demo(hjid: i64, nome: &str, matricula: &str) -> Obito {
    Obito {
        hjid,
        nome: nome.to_string(),
        data_obito: "2018-06-04".to_string(),
        matricula: matricula.to_string(),
        cartorio: "Registro Civil de Florianópolis".to_string(),
    }
}
