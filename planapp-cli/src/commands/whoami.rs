use anyhow::Result;
use planapp_core::session::StoredSession;

pub fn run() -> Result<()> {
    match StoredSession::load()? {
        Some(session) => {
            match &session.email {
                Some(email) => println!("{} ({})", email, session.uid),
                None => println!("{}", session.uid),
            }
            println!("provider: {}", session.provider);
        }
        None => println!("Not signed in."),
    }
    Ok(())
}
