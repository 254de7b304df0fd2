//! Final summary line.

use crate::types::ArtifactResult;

/// Formats the summary, e.g. `created signed aab bundle at /p/app-release.aab`.
pub fn report_line(result: &ArtifactResult) -> String {
    format!(
        "created {} {} at {}",
        if result.signed { "signed" } else { "unsigned" },
        result.kind.label(),
        result.path.display()
    )
}

/// Prints the summary to stdout.
pub fn report(result: &ArtifactResult) {
    println!("{}", report_line(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactKind;

    #[test]
    fn test_report_line() {
        let mut result = ArtifactResult::unsigned("/p/app-release.aab", ArtifactKind::Aab);
        assert_eq!(
            report_line(&result),
            "created unsigned aab bundle at /p/app-release.aab"
        );

        result.signed = true;
        assert_eq!(
            report_line(&result),
            "created signed aab bundle at /p/app-release.aab"
        );

        let apk = ArtifactResult {
            path: "/p/app-release-signed.apk".into(),
            kind: ArtifactKind::Apk,
            signed: true,
        };
        assert_eq!(
            report_line(&apk),
            "created signed apk at /p/app-release-signed.apk"
        );
    }
}
