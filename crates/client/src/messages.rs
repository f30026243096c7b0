//! Localized error messages.

use nabii_primitives::common::Language;

use crate::errors::ErrorKind;

const FR: &[(&str, &str)] = &[
    ("invalid_url", "L'URL « {url} » est invalide."),
    ("invalid_language", "La langue « {language} » n'est pas prise en charge."),
    ("invalid_mode", "Le mode « {mode} » n'existe pas."),
    ("invalid_credentials", "Identifiants invalides -> « {err} »"),
    ("missing_login", "Vous devez être connecté pour effectuer cette action."),
    (
        "missing_permission",
        "Cette action est réservée à la plateforme « {platform} ».",
    ),
    (
        "missing_credentials",
        "Aucun jeton d'accès ou de rafraîchissement n'est disponible.",
    ),
    ("rejected", "Requête refusée ({status}) sur « {path} » : {body}"),
    ("offline", "Impossible de joindre le serveur ({path}) : {err}"),
    ("invalid_response", "Réponse illisible sur « {path} » : {err}"),
    ("realtime", "Connexion temps réel impossible : {err}"),
    (
        "push_not_granted",
        "La permission de recevoir des notifications n'a pas été accordée.",
    ),
    (
        "push_unsupported",
        "Les notifications ne sont pas disponibles sur cette plateforme.",
    ),
    ("listener", "L'écouteur « {event} » a échoué : {err}"),
];

const EN: &[(&str, &str)] = &[
    ("invalid_url", "The URL \"{url}\" is invalid."),
    ("invalid_language", "The language \"{language}\" is not supported."),
    ("invalid_mode", "The mode \"{mode}\" does not exist."),
    ("invalid_credentials", "Invalid credentials -> \"{err}\""),
    ("missing_login", "You must be logged in to perform this action."),
    (
        "missing_permission",
        "This action is restricted to the \"{platform}\" platform.",
    ),
    (
        "missing_credentials",
        "No access or refresh token is available.",
    ),
    ("rejected", "Request rejected ({status}) on \"{path}\": {body}"),
    ("offline", "Unable to reach the server ({path}): {err}"),
    ("invalid_response", "Unreadable response on \"{path}\": {err}"),
    ("realtime", "Realtime connection failed: {err}"),
    (
        "push_not_granted",
        "Permission to receive notifications was not granted.",
    ),
    (
        "push_unsupported",
        "Notifications are not available on this platform.",
    ),
    ("listener", "The \"{event}\" listener failed: {err}"),
];

const fn catalogue(language: Language) -> &'static [(&'static str, &'static str)] {
    match language {
        Language::Fr => FR,
        Language::En => EN,
    }
}

fn key_and_params(kind: &ErrorKind) -> (&'static str, Vec<(&'static str, String)>) {
    match kind {
        ErrorKind::InvalidUrl { url } => ("invalid_url", vec![("url", url.clone())]),
        ErrorKind::InvalidLanguage { language } => {
            ("invalid_language", vec![("language", language.clone())])
        }
        ErrorKind::InvalidMode { mode } => ("invalid_mode", vec![("mode", mode.clone())]),
        ErrorKind::InvalidCredentials { reason } => {
            ("invalid_credentials", vec![("err", reason.clone())])
        }
        ErrorKind::MissingLogin => ("missing_login", vec![]),
        ErrorKind::MissingPermission { platform } => (
            "missing_permission",
            vec![("platform", platform.to_string())],
        ),
        ErrorKind::MissingCredentials => ("missing_credentials", vec![]),
        ErrorKind::Rejected { path, response } => (
            "rejected",
            vec![
                ("status", response.status.to_string()),
                ("path", path.clone()),
                ("body", response.body.clone()),
            ],
        ),
        ErrorKind::Offline { path, reason } => (
            "offline",
            vec![("path", path.clone()), ("err", reason.clone())],
        ),
        ErrorKind::InvalidResponse { path, reason } => (
            "invalid_response",
            vec![("path", path.clone()), ("err", reason.clone())],
        ),
        ErrorKind::Realtime { reason } => ("realtime", vec![("err", reason.clone())]),
        ErrorKind::PushNotGranted => ("push_not_granted", vec![]),
        ErrorKind::PushUnsupported => ("push_unsupported", vec![]),
        ErrorKind::Listener { event, reason } => (
            "listener",
            vec![("event", event.to_string()), ("err", reason.clone())],
        ),
    }
}

/// Renders the message for `kind`, substituting `{placeholder}`s.
pub(crate) fn render(kind: &ErrorKind, language: Language) -> String {
    let (key, params) = key_and_params(kind);

    let template = catalogue(language)
        .iter()
        .find_map(|(candidate, template)| (*candidate == key).then_some(*template))
        .unwrap_or(key);

    params
        .into_iter()
        .fold(template.to_owned(), |message, (name, value)| {
            message.replace(&format!("{{{name}}}"), &value)
        })
}
