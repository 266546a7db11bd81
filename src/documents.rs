//! Printable prescription documents.
//!
//! Renders the prescription page the mobile client prints. Plumbing, not
//! decision logic: everything here is already finalized by the caller.

use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionDocumentRequest {
    pub patient_name: String,
    pub patient_age: i64,
    pub patient_gender: String,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub health_conditions: Vec<String>,
    pub medicines: Vec<DocumentMedicine>,
    pub doctor_name: String,
    #[serde(default)]
    pub doctor_registration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentMedicine {
    pub medicine_name: String,
    pub dosage: String,
    pub timing: String,
    #[serde(default)]
    pub duration: Option<String>,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn list_items(items: &[String], empty_label: &str) -> String {
    if items.is_empty() {
        return format!("<li>{}</li>", empty_label);
    }
    items
        .iter()
        .map(|item| format!("<li>{}</li>", escape(item)))
        .collect()
}

/// Render the printable HTML page for a finalized prescription.
pub fn render_prescription(request: &PrescriptionDocumentRequest) -> String {
    let date = Utc::now().format("%B %d, %Y");
    let medicine_rows: String = request
        .medicines
        .iter()
        .enumerate()
        .map(|(idx, med)| {
            format!(
                "<tr><td>{}</td><td><strong>{}</strong></td><td>{}</td><td>{}</td></tr>",
                idx + 1,
                escape(&med.medicine_name),
                escape(&med.dosage),
                escape(&med.timing),
            )
        })
        .collect();

    let registration = request
        .doctor_registration
        .as_deref()
        .map(|reg| format!("<p>Registration No: {}</p>", escape(reg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
  body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; background: white; }}
  .header {{ text-align: center; border-bottom: 3px solid #297691; padding-bottom: 20px; margin-bottom: 30px; }}
  .header h1 {{ color: #297691; margin: 0; font-size: 28px; }}
  .section {{ margin-bottom: 25px; }}
  .section-title {{ background: #297691; color: white; padding: 10px 15px; margin-bottom: 15px; font-weight: bold; }}
  .info-label {{ color: #19647F; font-weight: bold; display: inline-block; width: 120px; }}
  table {{ width: 100%; border-collapse: collapse; margin-top: 10px; }}
  th {{ background: #4B95AF; color: white; padding: 12px; text-align: left; }}
  td {{ padding: 12px; border-bottom: 1px solid #6DB4CD; }}
  .footer {{ margin-top: 50px; padding-top: 20px; border-top: 2px solid #6DB4CD; text-align: right; }}
  .doctor-name {{ font-weight: bold; color: #297691; }}
  @media print {{ body {{ margin: 0; padding: 20px; }} }}
</style>
</head>
<body>
<div class="header">
  <h1>AYURVEDIC PRESCRIPTION</h1>
  <p>Traditional Medicine for Modern Wellness</p>
  <p>Date: {date}</p>
</div>
<div class="section">
  <div class="section-title">PATIENT INFORMATION</div>
  <p><span class="info-label">Name:</span>{name}</p>
  <p><span class="info-label">Age:</span>{age} years</p>
  <p><span class="info-label">Gender:</span>{gender}</p>
</div>
<div class="section">
  <div class="section-title">SYMPTOMS</div>
  <ul>{symptoms}</ul>
</div>
<div class="section">
  <div class="section-title">HEALTH CONDITIONS</div>
  <ul>{conditions}</ul>
</div>
<div class="section">
  <div class="section-title">PRESCRIBED MEDICINES</div>
  <table>
    <thead><tr><th>#</th><th>Medicine Name</th><th>Dosage</th><th>Timing</th></tr></thead>
    <tbody>{medicines}</tbody>
  </table>
</div>
<div class="footer">
  <p class="doctor-name">Dr. {doctor}</p>
  {registration}
  <p>Ayurvedic Practitioner</p>
</div>
</body>
</html>"#,
        date = date,
        name = escape(&request.patient_name),
        age = request.patient_age,
        gender = escape(&request.patient_gender),
        symptoms = list_items(&request.symptoms, "None reported"),
        conditions = list_items(&request.health_conditions, "None reported"),
        medicines = medicine_rows,
        doctor = escape(&request.doctor_name),
        registration = registration,
    )
}
