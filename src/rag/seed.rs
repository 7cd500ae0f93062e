//! Built-in clinical protocol corpus.
//!
//! A small set of standard emergency protocols that can be ingested through
//! `POST /seed` before any guideline PDFs have been uploaded. Synthetic
//! content for demonstration, not medical advice.

use crate::document::Document;

const CHEST_PAIN_PROTOCOL: &str = "\
Chest Pain Protocol

1. Initial assessment:
- Obtain a 12-lead ECG within 10 minutes of arrival.
- Record vital signs: blood pressure, heart rate, oxygen saturation.

2. Triage:
- ST-segment elevation (STEMI): activate the catheterization pathway immediately.
- No ST elevation (NSTEMI or unstable angina): order serial troponin measurements.

3. Immediate treatment (MONA):
- Morphine if pain persists.
- Oxygen if saturation is below 90%.
- Nitroglycerin sublingually.
- Aspirin 300mg chewed.

4. Contraindications:
- Avoid nitroglycerin when systolic blood pressure is below 90 mmHg.";

const SEPSIS_PROTOCOL: &str = "\
Sepsis Protocol (Hour-1 Bundle)

Complete the following within the first hour of suspected sepsis:

1. Measure the lactate level; remeasure if the initial lactate exceeds 2 mmol/L.
2. Draw blood cultures before starting antibiotics.
3. Administer broad-spectrum antibiotics intravenously without delay.
4. Give 30 mL/kg crystalloid fluids for hypotension or lactate of 4 mmol/L or higher.
5. Start norepinephrine to maintain a mean arterial pressure of 65 mmHg or higher
   if hypotension persists after fluid resuscitation.";

const HYPERTENSIVE_CRISIS_PROTOCOL: &str = "\
Hypertensive Crisis Management

Definition: systolic pressure above 180 mmHg or diastolic above 120 mmHg.

1. Emergency versus urgency:
- Emergency: evidence of target-organ damage (brain, heart, kidneys).
  Requires immediate intravenous blood pressure reduction.
- Urgency: no organ damage. Reduce pressure gradually with oral agents.

2. Preferred intravenous agents:
- Labetalol or nicardipine.

3. Treatment target:
- Reduce pressure by no more than 25% within the first hour to avoid
  cerebral hypoperfusion.
- Aim for 160/100 mmHg within 2 to 6 hours.";

const STROKE_PROTOCOL: &str = "\
Stroke Protocol

1. Rapid screening (FAST):
- Face, Arm, Speech, Time of onset.

2. Imaging:
- Non-contrast head CT within 25 minutes of arrival to exclude hemorrhage.

3. Thrombolysis:
- Alteplase is indicated within 4.5 hours of symptom onset when no
  contraindications are present.
- Check glucose first; hypoglycemia can mimic stroke.

4. Blood pressure:
- Do not treat unless above 220/120 mmHg, or above 185/110 mmHg when
  thrombolysis is planned.";

/// The bundled protocol documents, one per protocol, ready for ingestion.
pub fn seed_documents() -> Vec<Document> {
    vec![
        Document::single_page("chest_pain_protocol.txt", CHEST_PAIN_PROTOCOL),
        Document::single_page("sepsis_protocol.txt", SEPSIS_PROTOCOL),
        Document::single_page("hypertensive_crisis.txt", HYPERTENSIVE_CRISIS_PROTOCOL),
        Document::single_page("stroke_protocol.txt", STROKE_PROTOCOL),
    ]
}
