//! User-facing reply strings, keyed by locale.
//!
//! Translation-file loading lives outside the core; this static catalog
//! covers the two languages the bot ships with and falls back to English
//! for unknown codes.

/// Languages with a baked-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Ru,
}

impl Lang {
    /// Parse a locale code, falling back to English.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ru" => Lang::Ru,
            _ => Lang::En,
        }
    }
}

/// Every distinct reply the state machine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Greeting,
    UploadPrompt,
    UploadSecondPrompt,
    NotADocument,
    ChooseOperation,
    ChooseRotation,
    UnsupportedFormat,
    AlreadyPdf,
    NotPdf,
    Oversize,
    PleaseWait,
    Done,
    GenericFailure,
    Cancelled,
    LocaleSwitched,
    AdminGreeting,
}

/// Look up the text for a reply in the given language.
pub fn text(lang: Lang, reply: Reply) -> &'static str {
    match lang {
        Lang::En => english(reply),
        Lang::Ru => russian(reply),
    }
}

fn english(reply: Reply) -> &'static str {
    match reply {
        Reply::Greeting => "Hi, I am a PDF assistant. Pick an operation or just send me a file.",
        Reply::UploadPrompt => "Upload your file",
        Reply::UploadSecondPrompt => "Upload the second PDF",
        Reply::NotADocument => "Your response is not a document.\nPlease upload a document",
        Reply::ChooseOperation => "What should I do with this file?",
        Reply::ChooseRotation => "How should I rotate it?",
        Reply::UnsupportedFormat => {
            "I can't work with this file format.\nPlease upload a document, spreadsheet, presentation, image, or text file"
        }
        Reply::AlreadyPdf => "This file is already a PDF.\nPlease upload a file in another format",
        Reply::NotPdf => "This operation needs a PDF.\nPlease upload a .pdf file",
        Reply::Oversize => "This file is larger than 20 MB, which is more than I can handle.\nLet's start over",
        Reply::PleaseWait => "Please wait",
        Reply::Done => "Here is your file",
        Reply::GenericFailure => "Something went wrong while processing your file.\nLet's start over",
        Reply::Cancelled => "Your actions were cancelled. Let's start it over",
        Reply::LocaleSwitched => "Switched to English",
        Reply::AdminGreeting => "Hey BOSS",
    }
}

fn russian(reply: Reply) -> &'static str {
    match reply {
        Reply::Greeting => "Привет, я PDF-ассистент. Выберите операцию или просто пришлите файл.",
        Reply::UploadPrompt => "Загрузите ваш файл",
        Reply::UploadSecondPrompt => "Загрузите второй PDF",
        Reply::NotADocument => "Это не документ.\nПожалуйста, загрузите документ",
        Reply::ChooseOperation => "Что сделать с этим файлом?",
        Reply::ChooseRotation => "Как его повернуть?",
        Reply::UnsupportedFormat => {
            "Я не умею работать с этим форматом.\nЗагрузите документ, таблицу, презентацию, изображение или текстовый файл"
        }
        Reply::AlreadyPdf => "Этот файл уже PDF.\nЗагрузите файл в другом формате",
        Reply::NotPdf => "Для этой операции нужен PDF.\nЗагрузите файл .pdf",
        Reply::Oversize => "Файл больше 20 МБ — это больше, чем я могу обработать.\nНачнём заново",
        Reply::PleaseWait => "Пожалуйста, подождите",
        Reply::Done => "Вот ваш файл",
        Reply::GenericFailure => "Что-то пошло не так при обработке файла.\nНачнём заново",
        Reply::Cancelled => "Действия отменены. Начнём сначала",
        Reply::LocaleSwitched => "Переключился на русский",
        Reply::AdminGreeting => "Привет, БОСС",
    }
}
