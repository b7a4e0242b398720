use std::io;

use smsgate::{ClientConfig, MessageText, PhoneNumber, SendSms, SenderId};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smsgate=info")),
        )
        .init();

    let phone_raw = std::env::var("SMSGATE_PHONE").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SMSGATE_PHONE environment variable is required",
        )
    })?;
    let sender = std::env::var("SMSGATE_SENDER_ID").unwrap_or_else(|_| "smsgate".to_owned());
    let message = std::env::var("SMSGATE_MESSAGE")
        .unwrap_or_else(|_| "Hello from the smsgate demo.".to_owned());

    let client = ClientConfig::from_env()?.build()?;
    let request = SendSms::to_one(
        PhoneNumber::new(phone_raw)?,
        SenderId::new(sender)?,
        MessageText::new(message)?,
    );

    match client.send_sms(request).await {
        Ok(response) => {
            println!("status: {:?}, message: {:?}", response.status, response.message);
            for receipt in response.data.unwrap_or_default() {
                println!("uid: {:?}, to: {:?}", receipt.uid, receipt.to);
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("send failed ({:?}): {}", err.kind(), err.user_message());
            Err(err.into())
        }
    }
}
