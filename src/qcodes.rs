//! ICAO Annex 15 / Doc 8126 Q-code decoding tables.
//!
//! These are two separate lookup tables. `SUBJECTS` decodes letters 2+3 of a
//! Q-code (what the NOTAM is about); `CONDITIONS` decodes letters 4+5 (the
//! status of that subject). Many two-letter keys appear in both tables with
//! different meanings — e.g. "LC" is "Runway centre line lights" as a subject
//! but "Closed" as a condition. The tables must never be merged.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Subject codes: 2nd + 3rd letters of the Q-code.
pub static SUBJECTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // AGA — Lighting Facilities (L_)
        ("LA", "Approach lighting system"),
        ("LB", "Aerodrome beacon"),
        ("LC", "Runway centre line lights"),
        ("LD", "Landing direction indicator lights"),
        ("LE", "Runway edge lights"),
        ("LF", "Sequenced flashing lights"),
        ("LH", "High intensity runway lights"),
        ("LI", "Runway end identifier lights"),
        ("LJ", "Runway alignment indicator lights"),
        ("LK", "Category II components of approach lighting system"),
        ("LL", "Low intensity runway lights"),
        ("LM", "Medium intensity runway lights"),
        ("LP", "Precision approach path indicator"),
        ("LR", "All landing area lighting facilities"),
        ("LS", "Stopway lights"),
        ("LT", "Threshold lights"),
        ("LV", "Visual approach slope indicator system"),
        ("LW", "Heliport lighting"),
        ("LX", "Taxiway centre line lights"),
        ("LY", "Taxiway edge lights"),
        ("LZ", "Runway touchdown zone lights"),
        // AGA — Movement and Landing Area (M_)
        ("MA", "Movement area"),
        ("MB", "Bearing strength"),
        ("MC", "Clearway"),
        ("MD", "Declared distances"),
        ("MG", "Taxiing guidance system"),
        ("MH", "Runway arresting gear"),
        ("MK", "Parking area"),
        ("MM", "Daylight markings"),
        ("MN", "Apron"),
        ("MP", "Aircraft stands"),
        ("MR", "Runway"),
        ("MS", "Stopway"),
        ("MT", "Threshold"),
        ("MU", "Runway turning bay"),
        ("MW", "Strip"),
        ("MX", "Taxiway(s)"),
        // AGA — Facilities and Services (F_)
        ("FA", "Aerodrome"),
        ("FB", "Braking action measurement equipment"),
        ("FC", "Ceiling measurement equipment"),
        ("FD", "Docking system"),
        ("FF", "Fire fighting and rescue"),
        ("FG", "Ground movement control"),
        ("FH", "Helicopter alighting area/platform"),
        ("FL", "Landing direction indicator"),
        ("FM", "Meteorological service"),
        ("FO", "Fog dispersal system"),
        ("FP", "Heliport"),
        ("FS", "Snow removal equipment"),
        ("FT", "Transmissometer"),
        ("FU", "Fuel availability"),
        ("FW", "Wind direction indicator"),
        ("FZ", "Customs"),
        // COM — Communications and Radar Facilities (C_)
        ("CA", "Air/ground facility"),
        ("CE", "En route surveillance radar"),
        ("CG", "Ground controlled approach system"),
        ("CL", "Selective calling system (SELCAL)"),
        ("CM", "Surface movement radar"),
        ("CP", "Precision approach radar"),
        ("CR", "Surveillance radar element of precision approach system"),
        ("CS", "Secondary surveillance radar (SSR)"),
        ("CT", "Terminal area surveillance radar"),
        // COM — Instrument and Microwave Landing Systems (I_)
        ("ID", "DME associated with ILS"),
        ("IG", "ILS glide path"),
        ("II", "ILS inner marker"),
        ("IL", "ILS localiser"),
        ("IM", "ILS middle marker"),
        ("IO", "ILS outer marker"),
        ("IS", "ILS Category I"),
        ("IT", "ILS Category II"),
        ("IU", "ILS Category III"),
        ("IW", "Microwave landing system (MLS)"),
        ("IX", "ILS localiser outer"),
        ("IY", "ILS localiser middle"),
        // COM — Terminal and En Route Navigation Facilities (N_)
        ("NA", "All radio navigation facilities"),
        ("NB", "Non-directional radio beacon (NDB)"),
        ("NC", "DECCA"),
        ("ND", "Distance measuring equipment (DME)"),
        ("NF", "Fan marker"),
        ("NL", "Locator"),
        ("NM", "VOR/DME"),
        ("NN", "TACAN"),
        ("NO", "OMEGA"),
        ("NT", "VORTAC"),
        ("NV", "VOR"),
        ("NX", "Direction finding station"),
        // RAC — Airspace Organisation (A_)
        ("AA", "Minimum altitude"),
        ("AC", "Class B, C, D or E surface area"),
        ("AD", "Air defence identification zone (ADIZ)"),
        ("AE", "Control area (CTA)"),
        ("AF", "Flight information region (FIR)"),
        ("AG", "General aviation area"),
        ("AH", "Upper control area (UTA)"),
        ("AI", "Initial approach fix"),
        ("AK", "Upper flight information region (UIR)"),
        ("AL", "Minimum usable flight level"),
        ("AM", "Military operating area (MOA)"),
        ("AN", "Terminal control area (TCA)"),
        ("AO", "Control zone (CTR)"),
        ("AP", "Reporting point"),
        ("AR", "RNAV route"),
        ("AT", "Terminal area"),
        ("AU", "Upper advisory area"),
        ("AV", "Upper advisory route"),
        ("AX", "Intermediate approach fix"),
        ("AZ", "Aerodrome traffic zone (ATZ)"),
        // RAC — Air Traffic Procedures (P_)
        ("PA", "Standard instrument arrival (STAR)"),
        ("PD", "Standard instrument departure (SID)"),
        ("PF", "Flow control procedure"),
        ("PH", "Holding procedure"),
        ("PI", "Instrument approach procedure"),
        ("PL", "Obstacle clearance limit"),
        ("PM", "Aerodrome operating minima"),
        ("PO", "Obstacle clearance altitude"),
        ("PP", "Obstacle clearance height"),
        ("PR", "Radio failure procedure"),
        ("PT", "Transition altitude"),
        ("PU", "Missed approach procedure"),
        ("PX", "Minimum holding altitude"),
        ("PZ", "ADIZ procedure"),
        // RAC — Airspace Restrictions (R_)
        ("RA", "Airspace reservation"),
        ("RD", "Danger area"),
        ("RO", "Overflying"),
        ("RP", "Prohibited area"),
        ("RR", "Restricted area"),
        ("RT", "Temporary restricted area"),
        // Navigation Warnings (W_)
        ("WA", "Air display"),
        ("WB", "Aerobatics"),
        ("WC", "Captive balloon or kite"),
        ("WD", "Demolition of explosives"),
        ("WE", "Exercises"),
        ("WF", "Air refuelling"),
        ("WG", "Glider flying"),
        ("WJ", "Banner/target towing"),
        ("WL", "Ascent of free balloon"),
        ("WM", "Missile, gun or rocket firing"),
        ("WP", "Parachute jumping exercise"),
        ("WS", "Burning or blowing gas"),
        ("WT", "Mass movement of aircraft"),
        ("WU", "Unmanned aircraft"),
        ("WV", "Formation flight"),
        ("WZ", "Model flying"),
        // Other Information (O_)
        ("OA", "Aeronautical information service"),
        ("OB", "Obstacle"),
        ("OE", "Aircraft entry requirements"),
        ("OL", "Obstacle lights"),
        ("OR", "Rescue coordination centre"),
        // Plain language fallback
        ("XX", "Plain language"),
    ])
});

/// Condition codes: 4th + 5th letters of the Q-code.
pub static CONDITIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Availability (A_)
        ("AC", "Withdrawn for maintenance"),
        ("AD", "Available for daylight operation"),
        ("AF", "Flight checked and found reliable"),
        ("AG", "Operating but ground checked only, awaiting flight check"),
        ("AH", "Hours of service are now"),
        ("AK", "Resumed normal operations"),
        ("AM", "Military operations only"),
        ("AN", "Available for night operation"),
        ("AO", "Operational"),
        ("AP", "Available, prior permission required"),
        ("AR", "Available on request"),
        ("AS", "Unserviceable"),
        ("AU", "Not available"),
        ("AW", "Completely withdrawn"),
        ("AX", "Previously promulgated shutdown cancelled"),
        // Changes (C_)
        ("CA", "Activated"),
        ("CC", "Completed"),
        ("CD", "Deactivated"),
        ("CE", "Erected"),
        ("CF", "Operating frequency changed to"),
        ("CG", "Downgraded to"),
        ("CH", "Changed"),
        ("CI", "Identification or radio call sign changed to"),
        ("CL", "Realigned"),
        ("CM", "Displaced"),
        ("CO", "Operating"),
        ("CP", "Operating on reduced power"),
        ("CR", "Temporarily replaced by"),
        ("CS", "Installed"),
        // Hazard Conditions (H_)
        ("HA", "Braking action is"),
        ("HB", "Braking coefficient is"),
        ("HC", "Covered by compacted snow"),
        ("HD", "Covered by dry snow"),
        ("HE", "Covered by water"),
        ("HF", "Totally free of snow and ice"),
        ("HG", "Grass cutting in progress"),
        ("HH", "Hazard due to"),
        ("HI", "Covered by ice"),
        ("HJ", "Launch planned"),
        ("HK", "Migration in progress"),
        ("HL", "Snow clearance completed"),
        ("HM", "Marked by"),
        ("HN", "Covered by wet snow or slush"),
        ("HO", "Obscured by snow"),
        ("HP", "Snow clearance in progress"),
        ("HQ", "Operation cancelled"),
        ("HR", "Standing water"),
        ("HS", "Sanding in progress"),
        ("HT", "Approach according to signal area only"),
        ("HU", "Launch in progress"),
        ("HV", "Work completed"),
        ("HW", "Work in progress"),
        ("HX", "Concentration of birds"),
        ("HY", "Snow banks exist"),
        ("HZ", "Covered by frozen ruts and ridges"),
        // Limitations (L_) — entirely distinct from L_ subject codes above.
        ("LA", "Operating on auxiliary power supply"),
        ("LB", "Reserved for aircraft based therein"),
        ("LC", "Closed"),
        ("LD", "Unsafe"),
        ("LE", "Operating without auxiliary power supply"),
        ("LF", "Interference from"),
        ("LG", "Operating without identification"),
        ("LH", "Unserviceable for aircraft heavier than"),
        ("LI", "Closed to IFR operations"),
        ("LK", "Operating as a fixed light"),
        ("LL", "Usable for length of ... and width of ..."),
        ("LN", "Closed to all night operations"),
        ("LP", "Prohibited to"),
        ("LR", "Aircraft restricted to runways and taxiways"),
        ("LS", "Subject to interruption"),
        ("LT", "Limited to"),
        ("LV", "Closed to VFR operations"),
        ("LW", "Will take place"),
        ("LX", "Operating but caution advised due to"),
        // Trigger NOTAM (T_)
        ("TT", "Trigger NOTAM"),
        // Plain language fallback
        ("XX", "Plain language"),
    ])
});

/// Looks up `code` (2 chars) in `table`, falling back to `"Unknown (<code>)"`.
pub fn decode(table: &HashMap<&'static str, &'static str>, code: &str) -> String {
    match table.get(code) {
        Some(phrase) => phrase.to_string(),
        None => format!("Unknown ({code})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_and_condition_tables_disagree_on_shared_keys() {
        assert_eq!(decode(&SUBJECTS, "LC"), "Runway centre line lights");
        assert_eq!(decode(&CONDITIONS, "LC"), "Closed");
    }

    #[test]
    fn unknown_code_yields_placeholder() {
        assert_eq!(decode(&SUBJECTS, "ZZ"), "Unknown (ZZ)");
    }

    #[test]
    fn qmrlc_decodes_to_runway_closed() {
        assert_eq!(decode(&SUBJECTS, "MR"), "Runway");
        assert_eq!(decode(&CONDITIONS, "LC"), "Closed");
    }
}
