//! Session languages and user-facing message templates.
//!
//! Core logic never branches on the language; it only selects the default
//! store filename and, here, the message the presentation layer shows.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    #[default]
    En,
    Pl,
}

impl Language {
    /// Short code used in the default store filename.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Pl => "PL",
        }
    }
}

/// Map a core error to a message in the session language.
pub fn error_message(lang: Language, err: &CoreError) -> String {
    match (lang, err) {
        (Language::En, CoreError::InvalidInput(what)) => format!("Invalid input: {what}."),
        (Language::Pl, CoreError::InvalidInput(what)) => {
            format!("Nieprawidlowe dane: {what}.")
        }
        (Language::En, CoreError::AuthenticationFailed) => {
            "Wrong username or password.".into()
        }
        (Language::Pl, CoreError::AuthenticationFailed) => {
            "Bledna nazwa uzytkownika lub haslo.".into()
        }
        (Language::En, CoreError::LockedOut { remaining_secs }) => {
            format!("Too many failed attempts. Try again in {remaining_secs} seconds.")
        }
        (Language::Pl, CoreError::LockedOut { remaining_secs }) => {
            format!("Zbyt wiele nieudanych prob. Sprobuj ponownie za {remaining_secs} sekund.")
        }
        (Language::En, CoreError::DuplicateKey(what)) => {
            format!("Already exists: {what}.")
        }
        (Language::Pl, CoreError::DuplicateKey(what)) => {
            format!("Juz istnieje: {what}.")
        }
        (Language::En, CoreError::NotFound(what)) => format!("Not found: {what}."),
        (Language::Pl, CoreError::NotFound(what)) => format!("Nie znaleziono: {what}."),
        (Language::En, CoreError::Forbidden(_)) => "You are not allowed to do that.".into(),
        (Language::Pl, CoreError::Forbidden(_)) => "Nie masz do tego uprawnien.".into(),
        (Language::En, CoreError::StorageFailure(_)) => {
            "A storage error occurred. Your data may not have been saved.".into()
        }
        (Language::Pl, CoreError::StorageFailure(_)) => {
            "Wystapil blad zapisu. Dane mogly nie zostac zapisane.".into()
        }
    }
}

/// The confirmation shown before creating the first (superadmin) account.
pub fn superadmin_prompt(lang: Language) -> &'static str {
    match lang {
        Language::En => {
            "The first account becomes the permanent administrator. \
             Its password cannot be recovered. Continue?"
        }
        Language::Pl => {
            "Pierwsze konto zostanie stalym administratorem. \
             Hasla nie mozna odzyskac. Kontynuowac?"
        }
    }
}
