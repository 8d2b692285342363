use super::types::RunResults;
use crate::runner::result::ExecutionResult;
use anyhow::Result;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML report string from RunResults
pub fn generate_junit_xml(results: &RunResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let summary = &results.summary;
    let total_time = seconds(summary.duration_ms);

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-scenario-run"));
    suites_start.push_attribute(("tests", summary.total.to_string().as_str()));
    suites_start.push_attribute(("failures", summary.failed.to_string().as_str()));
    suites_start.push_attribute(("time", total_time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One <testsuite> per run, named after the target application
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", results.target_url.as_str()));
    suite_start.push_attribute(("tests", summary.total.to_string().as_str()));
    suite_start.push_attribute(("failures", summary.failed.to_string().as_str()));
    suite_start.push_attribute(("id", results.session_id.as_str()));
    suite_start.push_attribute(("time", total_time.as_str()));
    suite_start.push_attribute(("timestamp", results.generated_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for result in &results.results {
        write_test_case(&mut writer, result)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    result: &ExecutionResult,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.scenario.as_str()));
    case_start.push_attribute(("classname", "scenario"));
    case_start.push_attribute(("time", seconds(result.duration_ms.unwrap_or(0)).as_str()));
    writer.write_event(Event::Start(case_start))?;

    if !result.success {
        let message = result.error.as_deref().unwrap_or("Unknown error");
        let first_line = message.lines().next().unwrap_or(message);

        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", first_line));
        fail_start.push_attribute(("type", "ScenarioFailure"));
        writer.write_event(Event::Start(fail_start))?;
        writer.write_event(Event::Text(BytesText::new(message)))?;
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    if !result.stdout.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        write_cdata(writer, &result.stdout)?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }
    if !result.stderr.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-err")))?;
        write_cdata(writer, &result.stderr)?;
        writer.write_event(Event::End(BytesEnd::new("system-err")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Runner output may itself contain `]]>`, which cannot appear inside one
/// CDATA section. Split it across adjacent sections: `]]` ends one, `>` starts
/// the next.
fn write_cdata<W: std::io::Write>(writer: &mut Writer<W>, text: &str) -> Result<()> {
    let mut parts = text.split("]]>").peekable();
    let mut first = true;
    while let Some(part) = parts.next() {
        let mut section = String::with_capacity(part.len() + 3);
        if !first {
            section.push('>');
        }
        section.push_str(part);
        if parts.peek().is_some() {
            section.push_str("]]");
        }
        writer.write_event(Event::CData(BytesCData::new(section.as_str())))?;
        first = false;
    }
    Ok(())
}

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate JUnit report to a file or stdout
pub async fn generate(results: &RunResults, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(results)?;

    if let Some(path) = output {
        std::fs::write(path, xml)?;
        println!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }

    Ok(())
}

/// Write report to file
pub fn write_report(results: &RunResults, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}
