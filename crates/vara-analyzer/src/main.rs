use dashmap::DashMap;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use vara_syntax::{Location, analyze};

#[derive(Debug)]
struct Backend {
    client: Client,
    documents: DashMap<Url, String>,
}

impl Backend {
    async fn check(&self, uri: Url, text: String, version: Option<i32>) {
        let diagnostics = diagnostics(&text);
        tracing::debug!(%uri, count = diagnostics.len(), "publishing diagnostics");
        self.documents.insert(uri.clone(), text);
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_owned(),
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                ..ServerCapabilities::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "initialized!")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.check(document.uri, document.text, Some(document.version))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // full sync: the last change holds the whole document
        if let Some(change) = params.content_changes.into_iter().last() {
            let document = params.text_document;
            self.check(document.uri, change.text, Some(document.version))
                .await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        match saved_text(&self.documents, &uri, params.text) {
            Some(text) => self.check(uri, text, None).await,
            None => tracing::debug!(%uri, "save for a document that was never opened"),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }
}

/// Text to re-check on save; clients that do not send it get the open copy.
fn saved_text(documents: &DashMap<Url, String>, uri: &Url, sent: Option<String>) -> Option<String> {
    sent.or_else(|| documents.get(uri).map(|text| text.clone()))
}

/// Editor diagnostics for one document: a warning per undeclared use and the
/// fatal error, if any.
fn diagnostics(source: &str) -> Vec<Diagnostic> {
    let analysis = match analyze(source) {
        Ok(analysis) => analysis,
        Err(error) => {
            return vec![diagnostic(
                Range::default(),
                DiagnosticSeverity::ERROR,
                error.to_string(),
            )];
        }
    };

    let mut diagnostics: Vec<_> = analysis
        .undeclared
        .iter()
        .map(|name| {
            let location = Location::find(source, name);
            diagnostic(
                line_range(location.as_ref().map(|l| (l.line_number, l.line_text.as_str()))),
                DiagnosticSeverity::WARNING,
                format!("variable '{name}' used without declaration"),
            )
        })
        .collect();

    if let Some(error) = analysis.error() {
        let line = error.line_number.zip(error.line_text.as_deref());
        diagnostics.push(diagnostic(
            line_range(line),
            DiagnosticSeverity::ERROR,
            error.kind.to_string(),
        ));
    }
    diagnostics
}

fn diagnostic(range: Range, severity: DiagnosticSeverity, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(severity),
        source: Some("vara".to_owned()),
        message,
        ..Default::default()
    }
}

/// Whole-line range; the start of the document when the line is unknown.
fn line_range(line: Option<(usize, &str)>) -> Range {
    match line {
        Some((number, text)) => {
            let line = number.saturating_sub(1) as u32;
            let width = text.encode_utf16().count() as u32;
            Range::new(Position::new(line, 0), Position::new(line, width))
        }
        None => Range::default(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());

    let (service, socket) = LspService::new(|client| Backend {
        client,
        documents: DashMap::new(),
    });
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_program_has_no_diagnostics() {
        assert!(diagnostics("program var x : integer; begin x as 1; end.").is_empty());
    }

    #[test]
    fn undeclared_and_fatal_are_both_reported() {
        let source = "program var x : integer;\nbegin\ny as 1;\nend.";
        let found = diagnostics(source);
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(found[0].message, "variable 'y' used without declaration");
        assert_eq!(found[0].range, Range::new(Position::new(2, 0), Position::new(2, 7)));

        assert_eq!(found[1].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(found[1].message, "unknown type for variable 'y'");
        assert_eq!(found[1].range.start.line, 2);
    }

    #[test]
    fn save_without_text_rechecks_the_open_copy() {
        let documents = DashMap::new();
        let uri = Url::parse("file:///tmp/sample.vara").unwrap();
        documents.insert(uri.clone(), "program var x : integer; begin x as 1.5; end.".to_string());

        let text = saved_text(&documents, &uri, None).unwrap();
        let found = diagnostics(&text);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.starts_with("mismatched type for variable 'x'"));

        let sent = "program begin end.".to_string();
        assert_eq!(saved_text(&documents, &uri, Some(sent.clone())), Some(sent));

        let other = Url::parse("file:///tmp/other.vara").unwrap();
        assert_eq!(saved_text(&documents, &other, None), None);
    }

    #[test]
    fn unknown_line_points_at_document_start() {
        let found = diagnostics("program var x : integer; begin x as");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range, Range::default());
    }
}
