//! End-to-end report flow: scenarios recorded, reported concurrently and
//! written in order

use gwt_compare::{ReportEntry, EXTRA_RESULTS_TITLE, MISSING_RESULTS_TITLE};
use gwt_report::{
    ReportConfig, ReportContext, ReportSink, ScenarioRunResult, SinkError, SinkState,
};
use gwt_test_utils::{
    create_customer, create_invoice, init_test_logging, scenario_runs, FailingWriter,
    MemoryWriter, PanickingWriter,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn invoice_scenario(context: &ReportContext, index: u32) -> ScenarioRunResult {
    context
        .scenario(format!("invoice {index}"))
        .with_scope("Billing")
        .given(&create_customer("Ada"))
        .unwrap()
        .when(&index)
        .unwrap()
        .then(&create_invoice(index, &["A", "B"]), &create_invoice(index, &["A", "B"]))
        .unwrap()
        .then(&index, &(index + u32::from(index % 3 == 0)))
        .unwrap()
        .finish()
}

#[test]
fn late_scope_reaches_earlier_thens() {
    let result = ReportContext::default()
        .scenario("late scope")
        .then(&1_u8, &1_u8)
        .unwrap()
        .thens(&[&2_u8, &3_u8], &[&2_u8])
        .unwrap()
        .with_scope("Billing")
        .then(&4_u8, &4_u8)
        .unwrap()
        .finish();

    assert_eq!(result.scope(), Some("Billing"));
    assert_eq!(result.thens().len(), 4);
    assert!(result.thens().iter().all(|then| then.scope() == Some("Billing")));
}

#[test]
fn missing_expected_result_references_its_type() {
    let a = create_invoice(1, &["A"]);
    let b = create_customer("Bo");

    let result = ReportContext::default()
        .scenario("short")
        .thens(&[&a, &b], &[&a])
        .unwrap()
        .finish();

    let titles: Vec<&str> = result.thens().iter().map(ReportEntry::title).collect();
    assert_eq!(titles, vec!["Invoice", MISSING_RESULTS_TITLE]);
    assert_eq!(result.thens()[1].details()[0].render_value(), "Customer");

    let result = ReportContext::default()
        .scenario("long")
        .thens(&[&a], &[&a, &b])
        .unwrap()
        .finish();
    assert_eq!(result.thens()[1].title(), EXTRA_RESULTS_TITLE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reports_stay_contiguous() {
    init_test_logging();
    let writer = MemoryWriter::new().with_delay(Duration::from_micros(50));
    let config = ReportConfig::new().with_title("Concurrency");
    let sink = ReportSink::new(&config, writer.clone()).unwrap();
    let context = ReportContext::new(config);

    let tasks: Vec<_> = (0..32)
        .map(|index| {
            let sink = sink.clone();
            let context = context.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                sink.report(invoice_scenario(&context, index));
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    sink.write_final().await.unwrap();
    assert_eq!(sink.state(), SinkState::Done);

    let items = writer.items();
    assert_eq!(items.first().unwrap()["type"], "start_report");
    assert_eq!(items.first().unwrap()["title"], "Concurrency");
    assert_eq!(items.last().unwrap()["type"], "end_report");

    let runs = scenario_runs(&items);
    assert_eq!(runs.len(), 32);
    for run in &runs {
        let types: Vec<&str> = run.iter().map(|item| item["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["start_scenario", "given", "when", "then", "then", "end_scenario"]
        );
        assert_eq!(run[0]["scope"], "Billing");
    }

    let failed = runs
        .iter()
        .filter(|run| run.last().unwrap()["success"] == false)
        .count();
    assert_eq!(failed, 11);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn write_failure_surfaces_at_final_write() {
    let writer = FailingWriter::new(3);
    let memory = writer.memory.clone();
    let sink = ReportSink::new(&ReportConfig::default(), writer).unwrap();
    let context = ReportContext::default();

    sink.report(invoice_scenario(&context, 1));
    sink.report(invoice_scenario(&context, 2));

    let err = sink.write_final().await.unwrap_err();
    assert!(matches!(err, SinkError::WriteFailed(_)));
    assert!(err.to_string().contains("disk full at item 3"));
    assert_eq!(sink.state(), SinkState::Errored);

    // Items before the failure were written; nothing after it was.
    assert_eq!(
        memory.types(),
        vec!["start_report", "start_scenario", "given"]
    );

    sink.report(invoice_scenario(&context, 3));
    let again = sink.write_final().await.unwrap_err();
    assert_eq!(again.to_string(), err.to_string());
}

#[tokio::test]
async fn writer_panic_errors_the_sink() {
    let writer = PanickingWriter::default();
    let memory = writer.memory.clone();
    let sink = ReportSink::new(&ReportConfig::default(), writer).unwrap();

    sink.report(invoice_scenario(&ReportContext::default(), 7));
    let err = sink.write_final().await.unwrap_err();

    assert!(err.to_string().contains("renderer crashed"));
    assert_eq!(memory.types(), vec!["start_report"]);
}

#[tokio::test]
async fn sinks_are_independent() {
    let first = MemoryWriter::new();
    let second = MemoryWriter::new();
    let sink_a = ReportSink::new(&ReportConfig::new().with_title("A"), first.clone()).unwrap();
    let sink_b = ReportSink::new(&ReportConfig::new().with_title("B"), second.clone()).unwrap();

    sink_a.report(ScenarioRunResult::new("only in A"));
    sink_a.write_final().await.unwrap();
    sink_b.write_final().await.unwrap();

    assert_eq!(first.len(), 5);
    assert_eq!(second.types(), vec!["start_report", "end_report"]);
    assert_eq!(second.items()[0]["title"], "B");
}
