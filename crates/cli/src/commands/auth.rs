//! Session commands.

use storefront_client::Storefront;
use storefront_core::Credentials;

use super::CliError;

/// `sf login -i <identifier> -p <password>`
pub async fn login(app: &Storefront, identifier: String, password: String) -> Result<(), CliError> {
    let user = app
        .auth()
        .login(&Credentials {
            identifier,
            password,
        })
        .await?;
    println!("Logged in as {} <{}>", user.username, user.email);
    Ok(())
}

/// `sf logout`
pub fn logout(app: &Storefront) -> Result<(), CliError> {
    app.auth().logout()?;
    println!("Logged out.");
    Ok(())
}

/// `sf whoami`
pub async fn whoami(app: &Storefront) -> Result<(), CliError> {
    if !app.auth().is_authenticated()? {
        println!("Not logged in.");
        return Ok(());
    }
    let user = app.auth().current_user().await?;
    println!("{} <{}> (id {})", user.username, user.email, user.id);
    Ok(())
}
