//! Report reductions: group flat API lists by day/month, accumulate,
//! sort by key and hand the series to the charts.
use chrono::{Datelike, NaiveDate, Timelike};
use std::collections::HashMap;

use crate::format::month_label;
use crate::models::{Invoice, Patient, WhatsAppMessage};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FinancialSummary {
    pub billed: f64,
    pub collected: f64,
    pub pending: f64,
    pub count: usize,
    pub voided: usize,
}

pub fn financial_summary(invoices: &[Invoice]) -> FinancialSummary {
    let billed: f64 = invoices.iter().map(Invoice::billed).sum();
    let collected: f64 = invoices.iter().map(Invoice::collected).sum();
    FinancialSummary {
        billed,
        collected,
        pending: billed - collected,
        count: invoices.len(),
        voided: invoices.iter().filter(|i| i.is_voided()).count(),
    }
}

/// One row of the report's invoice table.
#[derive(Clone, Debug, PartialEq)]
pub struct InvoiceLine {
    pub numero: String,
    pub issued_on: Option<String>,
    pub paciente: String,
    pub billed: f64,
    pub collected: f64,
    pub estado: String,
}

/// Every invoice in server order, voided ones included.
pub fn invoice_lines(invoices: &[Invoice]) -> Vec<InvoiceLine> {
    let or_dash = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| "-".into());
    invoices
        .iter()
        .map(|i| InvoiceLine {
            numero: or_dash(&i.numero_factura),
            issued_on: i.issued_on().map(str::to_string),
            paciente: or_dash(&i.paciente_nombre),
            billed: i.billed(),
            collected: i.collected(),
            estado: i.estado.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| "N/A".into()),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct DayTotals {
    pub day: String,
    pub billed: f64,
    pub collected: f64,
}

/// Non-voided invoices summed per emission day, oldest first.
pub fn invoices_by_day(invoices: &[Invoice]) -> Vec<DayTotals> {
    let mut by_day: HashMap<String, (f64, f64)> = HashMap::new();
    for inv in invoices.iter().filter(|i| !i.is_voided()) {
        let entry = by_day.entry(inv.day()).or_insert((0.0, 0.0));
        entry.0 += inv.billed();
        entry.1 += inv.collected();
    }
    let mut out: Vec<DayTotals> = by_day
        .into_iter()
        .map(|(day, (billed, collected))| DayTotals { day, billed, collected })
        .collect();
    out.sort_by(|a, b| a.day.cmp(&b.day));
    out
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonthGrowth {
    pub key: String,
    pub label: String,
    pub new: usize,
    pub cumulative: usize,
}

/// New registrations per `YYYY-MM` with a running total. Patients without
/// a registration date are left out.
pub fn patient_growth(patients: &[Patient]) -> Vec<MonthGrowth> {
    let mut by_month: HashMap<String, usize> = HashMap::new();
    for day in patients.iter().filter_map(Patient::registration_day) {
        if let Some(month) = day.get(..7) {
            *by_month.entry(month.to_string()).or_insert(0) += 1;
        }
    }
    let mut months: Vec<(String, usize)> = by_month.into_iter().collect();
    months.sort_by(|a, b| a.0.cmp(&b.0));

    let mut running = 0;
    months
        .into_iter()
        .map(|(key, new)| {
            running += new;
            MonthGrowth { label: month_label(&key), key, new, cumulative: running }
        })
        .collect()
}

/// Registration-date window; bounds are inclusive `YYYY-MM-DD` strings and
/// an empty bound is open. Undated patients always pass.
pub fn patients_in_range<'a>(patients: &'a [Patient], from: &str, to: &str) -> Vec<&'a Patient> {
    patients
        .iter()
        .filter(|p| match p.registration_day() {
            None => true,
            Some(d) => (from.is_empty() || d >= from) && (to.is_empty() || d <= to),
        })
        .collect()
}

pub fn new_this_month(patients: &[Patient], today: NaiveDate) -> usize {
    let first = first_of_month(today).format("%Y-%m-%d").to_string();
    patients
        .iter()
        .filter_map(Patient::registration_day)
        .filter(|d| *d >= first.as_str())
        .count()
}

pub fn first_of_month(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

pub fn first_of_year(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
}

/// Five most recently registered patients; undated ones sort last.
pub fn recent_patients(patients: &[Patient], n: usize) -> Vec<Patient> {
    let mut sorted: Vec<&Patient> = patients.iter().collect();
    sorted.sort_by(|a, b| b.registration_day().cmp(&a.registration_day()).then(b.paciente_id.cmp(&a.paciente_id)));
    sorted.into_iter().take(n).cloned().collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MessageStats {
    pub sent_today: usize,
    pub errors: usize,
    pub total: usize,
    /// Rounded percentage of `ENVIADO` over all messages, 0 when empty.
    pub success_rate: u32,
}

pub fn message_stats(messages: &[WhatsAppMessage], today: NaiveDate) -> MessageStats {
    let today = today.format("%Y-%m-%d").to_string();
    let sent = messages.iter().filter(|m| m.estado == "ENVIADO").count();
    let sent_today = messages
        .iter()
        .filter(|m| m.estado == "ENVIADO" && m.fecha_envio.as_deref().is_some_and(|f| f.starts_with(&today)))
        .count();
    let errors = messages.iter().filter(|m| m.estado == "ERROR").count();
    let success_rate = if messages.is_empty() {
        0
    } else {
        ((sent as f64 / messages.len() as f64) * 100.0).round() as u32
    };
    MessageStats { sent_today, errors, total: messages.len(), success_rate }
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Buenos días",
        12..=18 => "Buenas tardes",
        _ => "Buenas noches",
    }
}

pub fn greeting_now() -> &'static str {
    greeting(chrono::Local::now().hour())
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(day: &str, billed: f64, paid: f64, estado: &str) -> Invoice {
        Invoice {
            fecha_emision: Some(day.into()),
            total_factura: Some(billed),
            total_pagado: Some(paid),
            estado: Some(estado.into()),
            ..Default::default()
        }
    }

    fn patient(id: i64, registered: Option<&str>) -> Patient {
        Patient { paciente_id: id, fecha_registro: registered.map(String::from), ..Default::default() }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn invoice_table_lists_every_invoice() {
        let mut voided = inv("2025-03-01", 80.0, 0.0, "ANULADA");
        voided.numero_factura = Some("001-001-0000045".into());
        voided.paciente_nombre = Some("Ana Paz".into());
        let blank = Invoice {
            fecha_emision: Some(String::new()),
            fecha_factura: Some("2025-03-02T10:00:00".into()),
            monto_total: Some(120.0),
            ..Default::default()
        };
        let lines = invoice_lines(&[voided, blank]);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            InvoiceLine {
                numero: "001-001-0000045".into(),
                issued_on: Some("2025-03-01".into()),
                paciente: "Ana Paz".into(),
                billed: 80.0,
                collected: 0.0,
                estado: "ANULADA".into(),
            }
        );
        assert_eq!(lines[1].numero, "-");
        assert_eq!(lines[1].issued_on.as_deref(), Some("2025-03-02"));
        assert_eq!(lines[1].billed, 120.0);
        assert_eq!(lines[1].estado, "N/A");
    }

    #[test]
    fn invoices_group_by_day_excluding_voided() {
        let list = vec![
            inv("2025-03-02T09:00:00", 100.0, 100.0, "PAGADA"),
            inv("2025-03-01", 50.0, 0.0, "PENDIENTE"),
            inv("2025-03-02", 30.0, 10.0, "PARCIAL"),
            inv("2025-03-01", 999.0, 0.0, "ANULADA"),
        ];
        let series = invoices_by_day(&list);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0], DayTotals { day: "2025-03-01".into(), billed: 50.0, collected: 0.0 });
        assert_eq!(series[1], DayTotals { day: "2025-03-02".into(), billed: 130.0, collected: 110.0 });

        let s = financial_summary(&list);
        assert_eq!(s.count, 4);
        assert_eq!(s.voided, 1);
        assert_eq!(s.pending, s.billed - s.collected);
    }

    #[test]
    fn growth_is_sorted_and_cumulative() {
        let list = vec![
            patient(1, Some("2025-02-10")),
            patient(2, Some("2024-12-31T23:00:00")),
            patient(3, Some("2025-02-01")),
            patient(4, None),
        ];
        let g = patient_growth(&list);
        assert_eq!(g.iter().map(|m| m.label.as_str()).collect::<Vec<_>>(), vec!["Dic 24", "Feb 25"]);
        assert_eq!(g[1].new, 2);
        assert_eq!(g[1].cumulative, 3);
    }

    #[test]
    fn range_filter_keeps_undated() {
        let list = vec![patient(1, Some("2025-01-05")), patient(2, Some("2024-06-01")), patient(3, None)];
        let ids: Vec<i64> = patients_in_range(&list, "2025-01-01", "2025-12-31").iter().map(|p| p.paciente_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(patients_in_range(&list, "", "").len(), 3);
        assert_eq!(new_this_month(&list, day("2025-01-20")), 1);
    }

    #[test]
    fn whatsapp_stats() {
        let m = |estado: &str, fecha: &str| WhatsAppMessage { estado: estado.into(), fecha_envio: Some(fecha.into()), ..Default::default() };
        let list = vec![
            m("ENVIADO", "2025-04-10T08:00:00"),
            m("ENVIADO", "2025-04-09T08:00:00"),
            m("ERROR", "2025-04-10T09:00:00"),
        ];
        let s = message_stats(&list, day("2025-04-10"));
        assert_eq!((s.sent_today, s.errors, s.success_rate), (1, 1, 67));
        assert_eq!(message_stats(&[], day("2025-04-10")).success_rate, 0);
    }

    #[test]
    fn greeting_by_hour() {
        assert_eq!(greeting(0), "Buenos días");
        assert_eq!(greeting(11), "Buenos días");
        assert_eq!(greeting(12), "Buenas tardes");
        assert_eq!(greeting(18), "Buenas tardes");
        assert_eq!(greeting(19), "Buenas noches");
    }

    #[test]
    fn recent_first() {
        let list = vec![patient(1, Some("2025-01-01")), patient(2, None), patient(3, Some("2025-03-01"))];
        let ids: Vec<i64> = recent_patients(&list, 2).iter().map(|p| p.paciente_id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
